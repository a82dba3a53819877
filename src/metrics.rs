use axum::{routing::get, Router};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::decision::Assessment;

pub const ASSESSMENTS_TOTAL: &str = "sepsis_assessments_total";
pub const ASSESSMENT_ERRORS_TOTAL: &str = "sepsis_assessment_errors_total";
pub const TRAJECTORY_TOTAL: &str = "sepsis_trajectory_total";
pub const ASSESSMENT_DURATION_MS: &str = "sepsis_assessment_duration_ms";

// The recorder is process-global; routers built later (tests) share it.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once and pre-register the counters.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| -> anyhow::Result<PrometheusHandle> {
            let handle = PrometheusBuilder::new().install_recorder()?;
            counter!(ASSESSMENTS_TOTAL).absolute(0);
            counter!(ASSESSMENT_ERRORS_TOTAL).absolute(0);
            Ok(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn record_assessment(a: &Assessment, elapsed_ms: f64) {
    counter!(ASSESSMENTS_TOTAL).increment(1);
    counter!(TRAJECTORY_TOTAL, "trajectory" => a.risk.trajectory.as_str()).increment(1);
    histogram!(ASSESSMENT_DURATION_MS).record(elapsed_ms);
}

pub fn record_error() {
    counter!(ASSESSMENT_ERRORS_TOTAL).increment(1);
}
