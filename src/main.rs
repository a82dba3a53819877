//! Sepsis Risk Engine: binary entrypoint
//! Boots the Axum HTTP server: clinical config, probability source, metrics, routes.

use sepsis_risk_engine::logging;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    if !logging::dev_logging_enabled() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging::default_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Picks up CLINICAL_CONFIG_PATH / SCORER_MODE / SCORER_MODEL_PATH; no-op without a .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    // A broken config file or model aborts startup instead of serving defaults.
    let router = sepsis_risk_engine::app().await?;

    Ok(router.into())
}
