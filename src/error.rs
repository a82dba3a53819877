//! Error types for the scoring engine and its configuration.
//!
//! Absence of data is never an error here: missing or malformed observations are
//! modeled as "not measured". Errors are reserved for caller contract violations
//! (an out-of-range probability) and for broken configuration files.

use thiserror::Error;

/// Errors raised by the engine on caller contract violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Upstream input outside its documented domain (e.g. probability not in [0,1]).
    #[error("invalid input for `{field}`: {value} (expected a finite value in [0, 1])")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Errors raised while validating a clinical configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("parameter `{parameter}`: {reason}")]
    InvalidRange { parameter: String, reason: String },

    #[error("critical threshold `{parameter}`: {reason}")]
    InvalidThreshold { parameter: String, reason: String },

    #[error("key vital `{0}` is not defined in the range table")]
    UnknownKeyVital(String),

    /// A builtin parameter spelled differently from its canonical name (`hr` for `HR`).
    #[error("parameter `{given}` must be spelled `{canonical}`")]
    NonCanonicalName { given: String, canonical: String },

    #[error("critical threshold `{0}` names neither a known feature nor a range parameter")]
    UnknownParameter(String),
}

impl EngineError {
    pub fn invalid_probability(value: f64) -> Self {
        Self::InvalidInput {
            field: "model_probability",
            value,
        }
    }
}
