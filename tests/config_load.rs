// tests/config_load.rs
use sepsis_risk_engine::config::{ClinicalConfig, ENV_CLINICAL_CONFIG_PATH};
use std::path::Path;
use std::{env, fs};

#[test]
fn shipped_config_matches_builtin_seed() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/clinical.toml");
    let cfg = ClinicalConfig::load_from_file(&path).unwrap();
    assert_eq!(&cfg, ClinicalConfig::builtin());
}

#[test]
fn invalid_ranges_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    // critical_low above the normal band
    let p = dir.path().join("bad.toml");
    fs::write(
        &p,
        r#"
[ranges.HR]
optimal = 70
min = 60
max = 100
critical_low = 65
critical_high = 150
"#,
    )
    .unwrap();
    let err = ClinicalConfig::load_from_file(&p).unwrap_err();
    assert!(format!("{err:#}").contains("critical_low"), "{err:#}");

    // not TOML at all
    let p = dir.path().join("garbage.toml");
    fs::write(&p, "ranges = [").unwrap();
    assert!(ClinicalConfig::load_from_file(&p).is_err());

    // critical table with inverted band
    let p = dir.path().join("bad.json");
    fs::write(
        &p,
        r#"{"critical":[{"parameter":"HR","normal_min":100,"normal_max":60,"critical_low":40}]}"#,
    )
    .unwrap();
    assert!(ClinicalConfig::load_from_file(&p).is_err());
}

#[serial_test::serial]
#[test]
fn fallback_toml_in_config_dir_is_used() {
    // Isolate CWD so the repo's own config/ does not interfere
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CLINICAL_CONFIG_PATH);

    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("clinical.toml"), r#"key_vitals = ["HR", "Lactate"]"#).unwrap();

    let cfg = ClinicalConfig::load_default().unwrap();
    assert_eq!(cfg.key_vitals, vec!["HR".to_string(), "Lactate".to_string()]);
    assert_eq!(cfg.ranges.len(), 13);

    env::set_current_dir(&old).unwrap();
}
