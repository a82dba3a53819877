//! # Assessment Engine
//! Pure, testable logic that maps `(config, observations, probability)` → `Assessment`.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Flow: abnormality scan → key-vital deviations → blended risk + trajectory →
//! labels, status, reasons and contributors.

use std::collections::BTreeSet;

use tracing::debug;

use crate::abnormality;
use crate::blend::validate_probability;
use crate::config::ClinicalConfig;
use crate::decision::{Assessment, Contributor, Reason, ReasonKind, MAX_CONTRIBUTORS};
use crate::deviation::key_vital_deviations;
use crate::error::EngineError;
use crate::observation::ObservationSet;
use crate::trajectory::{risk_trajectory, RiskResult};

/// Score one observation set against `cfg` using an externally supplied probability.
///
/// Fails only when `model_probability` is outside [0,1] or not finite.
pub fn assess(
    cfg: &ClinicalConfig,
    obs: &ObservationSet,
    model_probability: f64,
) -> Result<Assessment, EngineError> {
    let p = validate_probability(model_probability)?;

    let report = abnormality::detect(obs, &cfg.ranges, &cfg.critical);
    let deviations = key_vital_deviations(obs, &cfg.ranges, &cfg.key_vitals);
    let risk = risk_trajectory(p, deviations)?;

    debug!(
        target: "engine",
        obs = %obs.fingerprint(),
        measured = obs.len(),
        ignored = obs.ignored(),
        severity = report.severity_score,
        abnormal = report.abnormal_count(),
        trajectory = risk.trajectory.as_str(),
        "assessment computed"
    );

    let critical: BTreeSet<&str> = report.critical().map(|i| i.parameter.as_str()).collect();
    let contributors: Vec<Contributor> = report
        .exceedances
        .iter()
        .filter(|e| !critical.contains(e.parameter.as_str()))
        .take(MAX_CONTRIBUTORS)
        .map(Contributor::from)
        .collect();

    let critical_reasons: Vec<Reason> = report
        .critical()
        .map(|i| {
            Reason::new(format!("CRITICAL: {}", i.description))
                .weighted(1.0)
                .kind(ReasonKind::CriticalVital)
        })
        .collect();

    let a = Assessment::new(p, risk, report);

    let sepsis = Reason::new(format!(
        "ML sepsis risk {:.0}% ({})",
        p * 100.0,
        a.sepsis_label.as_str()
    ))
    .weighted(p)
    .kind(ReasonKind::SepsisRisk);
    let instability = Reason::new(format!(
        "{} (severity score {}, {} value(s) outside normal range)",
        a.instability_label.as_str(),
        a.abnormalities.severity_score,
        a.abnormalities.abnormal_count()
    ))
    .kind(ReasonKind::Instability);
    let trajectory = trajectory_reason(&a.risk);

    let mut a = a.with_reason(sepsis).with_reason(instability);
    for r in critical_reasons {
        a = a.with_reason(r);
    }
    a = a.with_reason(trajectory);

    for c in contributors {
        a = a.with_contributor(c);
    }
    Ok(a)
}

fn trajectory_reason(risk: &RiskResult) -> Reason {
    match risk.future_risk_6h {
        Some(future) => Reason::new(format!(
            "6h trajectory {}: risk {:.0}% now, {:.0}% projected (velocity {:+.2})",
            risk.trajectory.as_str(),
            risk.current_risk * 100.0,
            future * 100.0,
            risk.risk_velocity
        ))
        .weighted(future)
        .kind(ReasonKind::Trajectory),
        None => Reason::new("No clinical trigger present; 6h forecast not indicated")
            .kind(ReasonKind::Trajectory),
    }
}
