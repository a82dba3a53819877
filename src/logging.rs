//! Log targets and the development log switch.
//!
//! Every `tracing` call in the crate names one of [`TARGETS`]; the binary builds
//! its default filter from the same list so a new target cannot be left out.

/// `target:` names used by the library, with their development verbosity.
pub const TARGETS: [(&str, &str); 3] = [("engine", "debug"), ("api", "info"), ("config", "info")];

/// Set to `1` to turn on compact logs in a development environment.
pub const DEV_LOG_ENV: &str = "SEPSIS_DEV_LOG";

/// Directive applied to everything outside [`TARGETS`].
const FALLBACK_LEVEL: &str = "warn";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_filter() -> String {
    let mut parts: Vec<String> = TARGETS.iter().map(|(t, lvl)| format!("{t}={lvl}")).collect();
    parts.push(FALLBACK_LEVEL.to_string());
    parts.join(",")
}

/// Dev logging needs both the opt-in flag and a development environment
/// (debug build, or `SHUTTLE_ENV` in {local, development, dev}).
pub fn dev_logging_requested(flag: Option<&str>, debug_build: bool, shuttle_env: Option<&str>) -> bool {
    let opted_in = flag.is_some_and(|v| v.trim() == "1");
    let dev_env = debug_build
        || shuttle_env.is_some_and(|e| {
            matches!(e.to_ascii_lowercase().as_str(), "local" | "development" | "dev")
        });
    opted_in && dev_env
}

/// [`dev_logging_requested`] read from the process environment.
pub fn dev_logging_enabled() -> bool {
    dev_logging_requested(
        std::env::var(DEV_LOG_ENV).ok().as_deref(),
        cfg!(debug_assertions),
        std::env::var("SHUTTLE_ENV").ok().as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_lists_every_target() {
        assert_eq!(default_filter(), "engine=debug,api=info,config=info,warn");
    }

    #[test]
    fn dev_logging_needs_flag_and_dev_env() {
        assert!(dev_logging_requested(Some("1"), true, None));
        assert!(dev_logging_requested(Some("1"), false, Some("Local")));
        assert!(!dev_logging_requested(Some("1"), false, Some("production")));
        assert!(!dev_logging_requested(Some("1"), false, None));
        assert!(!dev_logging_requested(Some("true"), true, None));
        assert!(!dev_logging_requested(None, true, Some("dev")));
    }
}
