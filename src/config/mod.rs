// src/config/mod.rs
pub mod clinical;

pub use clinical::{ClinicalConfig, DEFAULT_CLINICAL_CONFIG_PATH, ENV_CLINICAL_CONFIG_PATH};
