//! HTTP surface: decode observations, obtain a probability, call the engine,
//! return JSON. No markup is ever rendered here.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::classifier::DynProbabilitySource;
use crate::config::ClinicalConfig;
use crate::decision::Assessment;
use crate::engine;
use crate::error::EngineError;
use crate::metrics::{self, Metrics};
use crate::observation::ObservationSet;
use crate::ranges::RangeTable;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClinicalConfig>,
    pub scorer: DynProbabilitySource,
}

impl AppState {
    pub fn new(config: ClinicalConfig, scorer: DynProbabilitySource) -> Self {
        Self {
            config: Arc::new(config),
            scorer,
        }
    }
}

/// Build the router the binary serves. `/metrics` is attached when `metrics` is given.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/assess", post(assess_json))
        .route("/predict", post(predict_form))
        .route("/config/ranges", get(config_ranges));

    if let Some(m) = metrics {
        app = app.merge(m.router());
    }

    app.layer(CorsLayer::very_permissive()).with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AssessReq {
    #[serde(default)]
    pub observations: serde_json::Map<String, serde_json::Value>,
    /// Externally computed probability; the configured source is used when absent.
    #[serde(default)]
    pub probability: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AssessResp {
    pub assessed_at: DateTime<Utc>,
    /// Which source produced `model_probability` (`"request"` when supplied by the caller).
    pub probability_source: String,
    #[serde(flatten)]
    pub assessment: Assessment,
}

#[derive(Debug)]
pub enum ApiError {
    InvalidInput(EngineError),
    Scorer(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::InvalidInput(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Scorer(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("probability source failed: {e}")),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

async fn assess_json(
    State(state): State<AppState>,
    Json(body): Json<AssessReq>,
) -> Result<Json<AssessResp>, ApiError> {
    let obs = ObservationSet::from_json_map_in(&state.config.ranges, &body.observations);
    run(&state, &obs, body.probability).map(Json)
}

async fn predict_form(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Json<AssessResp>, ApiError> {
    let obs = ObservationSet::from_fields_in(&state.config.ranges, fields);
    run(&state, &obs, None).map(Json)
}

async fn config_ranges(State(state): State<AppState>) -> Json<RangeTable> {
    Json(state.config.ranges.clone())
}

fn run(state: &AppState, obs: &ObservationSet, supplied: Option<f64>) -> Result<AssessResp, ApiError> {
    let started = Instant::now();

    let (p, source) = match supplied {
        Some(p) => (p, "request"),
        None => {
            let p = state.scorer.probability(obs).map_err(|e| {
                metrics::record_error();
                warn!(target: "api", obs = %obs.fingerprint(), error = %e, "probability source failed");
                ApiError::Scorer(e)
            })?;
            (p, state.scorer.name())
        }
    };

    let assessment = engine::assess(&state.config, obs, p).map_err(|e| {
        metrics::record_error();
        warn!(target: "api", obs = %obs.fingerprint(), error = %e, "assessment rejected");
        ApiError::InvalidInput(e)
    })?;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::record_assessment(&assessment, elapsed_ms);
    info!(
        target: "api",
        obs = %obs.fingerprint(),
        source,
        status = ?assessment.status,
        trajectory = assessment.risk.trajectory.as_str(),
        elapsed_ms,
        "assessment served"
    );

    Ok(AssessResp {
        assessed_at: Utc::now(),
        probability_source: source.to_string(),
        assessment,
    })
}
