// src/config/clinical.rs
//! Injectable clinical configuration: the range table, the critical-threshold
//! table and the key-vital subset used by the blender.
//!
//! Resolution order (see [`ClinicalConfig::load_default`]):
//! 1) `$CLINICAL_CONFIG_PATH` (must exist)
//! 2) `config/clinical.toml`
//! 3) `config/clinical.json`
//! 4) built-in seed
//!
//! Every section is optional; a missing section keeps its built-in default.
//! A file that exists but fails to parse or validate is a startup error.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;
use crate::observation::canonical_name;
use crate::ranges::{CriticalThreshold, RangeTable, DEFAULT_KEY_VITALS};

pub const DEFAULT_CLINICAL_CONFIG_PATH: &str = "config/clinical.toml";
pub const ENV_CLINICAL_CONFIG_PATH: &str = "CLINICAL_CONFIG_PATH";

static BUILTIN: Lazy<ClinicalConfig> = Lazy::new(ClinicalConfig::default_seed);

fn default_ranges() -> RangeTable {
    RangeTable::default_seed()
}
fn default_critical() -> Vec<CriticalThreshold> {
    CriticalThreshold::default_seed()
}
fn default_key_vitals() -> Vec<String> {
    DEFAULT_KEY_VITALS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalConfig {
    #[serde(default = "default_ranges")]
    pub ranges: RangeTable,
    #[serde(default = "default_critical")]
    pub critical: Vec<CriticalThreshold>,
    #[serde(default = "default_key_vitals")]
    pub key_vitals: Vec<String>,
}

impl Default for ClinicalConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl ClinicalConfig {
    pub fn default_seed() -> Self {
        Self {
            ranges: default_ranges(),
            critical: default_critical(),
            key_vitals: default_key_vitals(),
        }
    }

    /// Shared, process-wide copy of the built-in seed.
    pub fn builtin() -> &'static ClinicalConfig {
        &BUILTIN
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranges.validate()?;
        let mut seen: Vec<&str> = Vec::new();
        for (name, _) in self.ranges.iter() {
            if let Some(canonical) = canonical_name(name).filter(|c| *c != name) {
                return Err(ConfigError::NonCanonicalName {
                    given: name.to_string(),
                    canonical: canonical.to_string(),
                });
            }
            // table-only names must stay unambiguous under case-insensitive lookup
            if let Some(prev) = seen.iter().find(|p| p.eq_ignore_ascii_case(name)) {
                return Err(ConfigError::NonCanonicalName {
                    given: name.to_string(),
                    canonical: prev.to_string(),
                });
            }
            seen.push(name);
        }
        for t in &self.critical {
            t.validate()?;
            let p = t.parameter.as_str();
            if self.ranges.contains(p) {
                continue;
            }
            match canonical_name(p) {
                Some(c) if c == p => {}
                Some(c) => {
                    return Err(ConfigError::NonCanonicalName {
                        given: p.to_string(),
                        canonical: c.to_string(),
                    })
                }
                None => return Err(ConfigError::UnknownParameter(p.to_string())),
            }
        }
        for k in &self.key_vitals {
            if !self.ranges.contains(k) {
                return Err(ConfigError::UnknownKeyVital(k.clone()));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ClinicalConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: ClinicalConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path; the extension selects TOML or JSON (TOML otherwise).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading clinical config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = if ext == "json" {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .with_context(|| format!("parsing clinical config {}", path.display()))?;

        info!(
            target: "config",
            path = %path.display(),
            ranges = cfg.ranges.len(),
            critical = cfg.critical.len(),
            key_vitals = cfg.key_vitals.len(),
            "clinical config loaded"
        );
        Ok(cfg)
    }

    /// Load using env var + fallbacks; no file at all means the built-in seed.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CLINICAL_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!(
                "{ENV_CLINICAL_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            ));
        }
        let toml_p = PathBuf::from(DEFAULT_CLINICAL_CONFIG_PATH);
        if toml_p.exists() {
            return Self::load_from_file(&toml_p);
        }
        let json_p = PathBuf::from("config/clinical.json");
        if json_p.exists() {
            return Self::load_from_file(&json_p);
        }
        info!(target: "config", "no clinical config file found; using built-in ranges");
        Ok(Self::default_seed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn empty_toml_keeps_defaults() {
        let cfg = ClinicalConfig::from_toml_str("").unwrap();
        assert_eq!(&cfg, ClinicalConfig::builtin());
    }

    #[test]
    fn toml_overrides_ranges_section() {
        let toml = r#"
            key_vitals = ["HR"]

            [ranges.HR]
            optimal = 75
            min = 55
            max = 95
            critical_low = 35
            critical_high = 140
            unit = "bpm"
        "#;
        let cfg = ClinicalConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.ranges.len(), 1);
        assert_eq!(cfg.ranges.get("HR").unwrap().optimal, 75.0);
        assert_eq!(cfg.critical.len(), 5);
    }

    #[test]
    fn key_vital_must_exist_in_ranges() {
        let toml = r#"
            key_vitals = ["HR", "Lactate"]

            [ranges.HR]
            optimal = 70
            min = 60
            max = 100
            critical_low = 40
        "#;
        let err = ClinicalConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("Lactate"), "{err}");
    }

    #[test]
    fn added_parameter_is_accepted() {
        let toml = r#"
            key_vitals = ["HR", "pH"]

            [ranges.HR]
            optimal = 70
            min = 60
            max = 100
            critical_low = 40

            [ranges.pH]
            optimal = 7.4
            min = 7.35
            max = 7.45
            critical_low = 7.0
            critical_high = 7.8

            [[critical]]
            parameter = "pH"
            normal_min = 7.35
            normal_max = 7.45
            critical_low = 7.2
        "#;
        let cfg = ClinicalConfig::from_toml_str(toml).unwrap();
        assert!(cfg.ranges.contains("pH"));
        assert_eq!(cfg.critical[0].parameter, "pH");
    }

    #[test]
    fn non_canonical_range_name_is_rejected() {
        let toml = r#"
            key_vitals = []

            [ranges.hr]
            optimal = 70
            min = 60
            max = 100
            critical_low = 40
        "#;
        let err = ClinicalConfig::from_toml_str(toml).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NonCanonicalName {
                given: "hr".into(),
                canonical: "HR".into()
            })
        );
    }

    #[test]
    fn case_duplicate_range_names_are_rejected() {
        let mut cfg = ClinicalConfig::default_seed();
        let def = crate::ranges::RangeDefinition::new(7.4, 7.35, 7.45, 7.0, None);
        cfg.ranges.insert("pH", def.clone()).unwrap();
        cfg.ranges.insert("PH", def).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::NonCanonicalName { .. })));
    }

    #[test]
    fn unresolvable_critical_parameter_is_rejected() {
        let json = r#"{"critical": [{"parameter": "Ketones", "normal_min": 0, "normal_max": 0.6, "critical_low": 0}]}"#;
        let err = ClinicalConfig::from_json_str(json).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownParameter("Ketones".into()))
        );

        let json = r#"{"critical": [{"parameter": "heart_rate", "normal_min": 60, "normal_max": 100, "critical_low": 40}]}"#;
        let err = ClinicalConfig::from_json_str(json).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NonCanonicalName { .. })
        ));
    }

    #[test]
    fn json_is_accepted() {
        let json = r#"{"critical": [{"parameter": "HR", "normal_min": 60, "normal_max": 100, "critical_low": 40, "critical_high": 130}]}"#;
        let cfg = ClinicalConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.critical.len(), 1);
        assert_eq!(cfg.critical[0].critical_high, Some(130.0));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CLINICAL_CONFIG_PATH);

        let cfg = ClinicalConfig::load_default().unwrap();
        assert_eq!(&cfg, ClinicalConfig::builtin());

        let p = tmp.path().join("custom.json");
        fs::write(&p, r#"{"key_vitals": ["HR"]}"#).unwrap();
        env::set_var(ENV_CLINICAL_CONFIG_PATH, p.display().to_string());
        let cfg = ClinicalConfig::load_default().unwrap();
        assert_eq!(cfg.key_vitals, vec!["HR".to_string()]);

        env::set_var(ENV_CLINICAL_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(ClinicalConfig::load_default().is_err());

        env::remove_var(ENV_CLINICAL_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
