// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod abnormality;
pub mod api;
pub mod blend;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod deviation;
pub mod engine;
pub mod error;
pub mod labels;
pub mod logging;
pub mod metrics;
pub mod observation;
pub mod ranges;
pub mod sirs;
pub mod trajectory;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ClinicalConfig;
pub use crate::decision::{Assessment, PredictionStatus};
pub use crate::engine::assess;
pub use crate::error::{ConfigError, EngineError};
pub use crate::observation::ObservationSet;
pub use crate::trajectory::{RiskResult, Trajectory};

use anyhow::Context;
use axum::Router;
use tracing::info;

/// Build the full in-process app the binary serves: clinical config and
/// probability source from the environment, Prometheus recorder, router.
pub async fn app() -> anyhow::Result<Router> {
    let config = ClinicalConfig::load_default().context("loading clinical config")?;
    let scorer = classifier::build_probability_source().context("building probability source")?;
    let metrics = metrics::Metrics::init().context("installing metrics recorder")?;

    info!(
        target: "api",
        ranges = config.ranges.len(),
        key_vitals = config.key_vitals.len(),
        scorer = scorer.name(),
        "router ready"
    );
    Ok(api::router(AppState::new(config, scorer), Some(&metrics)))
}
