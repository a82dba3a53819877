//! # Trajectory Projector
//!
//! Turns the blended current risk and the per-vital deviations into a 6-hour
//! forecast:
//! 1. clinical trigger gate (no trigger and a quiet mean deviation ⇒ no forecast);
//! 2. abnormality burden from the count of significant/moderate deviations;
//! 3. velocity + trajectory from the risk-tier × burden-tier policy table;
//! 4. `future = clamp(current + velocity)`.
//!
//! No speculative percentage is ever emitted for an apparently healthy patient.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blend::{blend, validate_probability, vital_risk};
use crate::error::EngineError;

/// Deviation above which a vital counts as significantly abnormal.
pub const SIGNIFICANT_DEVIATION: f64 = 0.3;
/// Lower edge of the moderate band (upper edge is `SIGNIFICANT_DEVIATION`, inclusive).
pub const MODERATE_DEVIATION: f64 = 0.15;
pub const MEAN_DEVIATION_TRIGGER: f64 = 0.10;
pub const PROBABILITY_TRIGGER: f64 = 0.15;
/// Below this mean deviation, an untriggered patient gets no forecast.
pub const QUIET_MEAN_DEVIATION: f64 = 0.05;

pub const SIGNIFICANT_BURDEN_WEIGHT: f64 = 0.4;
pub const MODERATE_BURDEN_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    Escalating,
    Stable,
    Improving,
    NotIndicated,
}

impl Trajectory {
    pub fn as_str(self) -> &'static str {
        match self {
            Trajectory::Escalating => "escalating",
            Trajectory::Stable => "stable",
            Trajectory::Improving => "improving",
            Trajectory::NotIndicated => "not_indicated",
        }
    }
}

/// Velocity rule for one policy cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Velocity {
    Fixed(f64),
    /// `min(cap, burden * factor)`
    Scaled { factor: f64, cap: f64 },
}

impl Velocity {
    pub fn resolve(self, burden: f64) -> f64 {
        match self {
            Velocity::Fixed(v) => v,
            Velocity::Scaled { factor, cap } => (burden * factor).min(cap),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurdenBand {
    pub min_burden: f64,
    pub velocity: Velocity,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskTier {
    pub min_risk: f64,
    /// Checked in order; the last band is the catch-all.
    pub bands: [BurdenBand; 3],
}

const fn band(min_burden: f64, velocity: Velocity, trajectory: Trajectory) -> BurdenBand {
    BurdenBand {
        min_burden,
        velocity,
        trajectory,
    }
}

use self::Trajectory::{Escalating, Improving, Stable};
use self::Velocity::{Fixed, Scaled};

/// Clinical policy: risk tiers from highest to lowest.
pub static POLICY: [RiskTier; 4] = [
    RiskTier {
        min_risk: 0.7,
        bands: [
            band(0.6, Fixed(0.12), Escalating),
            band(0.3, Fixed(0.06), Escalating),
            band(f64::NEG_INFINITY, Fixed(0.02), Stable),
        ],
    },
    RiskTier {
        min_risk: 0.5,
        bands: [
            band(0.6, Fixed(0.18), Escalating),
            band(0.3, Fixed(0.10), Escalating),
            band(f64::NEG_INFINITY, Fixed(0.03), Stable),
        ],
    },
    RiskTier {
        min_risk: 0.3,
        bands: [
            band(0.5, Fixed(0.15), Escalating),
            band(0.2, Fixed(0.05), Stable),
            band(f64::NEG_INFINITY, Fixed(-0.02), Improving),
        ],
    },
    RiskTier {
        min_risk: f64::NEG_INFINITY,
        bands: [
            band(0.4, Scaled { factor: 0.15, cap: 0.08 }, Escalating),
            band(0.2, Fixed(0.01), Stable),
            band(f64::NEG_INFINITY, Fixed(-0.02), Improving),
        ],
    },
];

/// Outcome of the trigger gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClinicalTrigger {
    pub significantly_abnormal: usize,
    pub moderately_abnormal: usize,
    pub mean_deviation: f64,
    /// Any of: a significant deviation, a moderate deviation, mean > 0.10, probability > 0.15.
    pub triggered: bool,
}

impl ClinicalTrigger {
    /// Whether a forecast is produced: triggered, or not quiet enough to skip.
    pub fn forecast_indicated(&self) -> bool {
        self.triggered || self.mean_deviation >= QUIET_MEAN_DEVIATION
    }
}

pub fn clinical_trigger(model_probability: f64, deviations: &BTreeMap<String, f64>) -> ClinicalTrigger {
    let significantly_abnormal = deviations
        .values()
        .filter(|&&v| v > SIGNIFICANT_DEVIATION)
        .count();
    let moderately_abnormal = deviations
        .values()
        .filter(|&&v| (MODERATE_DEVIATION..=SIGNIFICANT_DEVIATION).contains(&v))
        .count();
    let mean_deviation = vital_risk(deviations);

    let triggered = significantly_abnormal > 0
        || moderately_abnormal >= 1
        || mean_deviation > MEAN_DEVIATION_TRIGGER
        || model_probability > PROBABILITY_TRIGGER;

    ClinicalTrigger {
        significantly_abnormal,
        moderately_abnormal,
        mean_deviation,
        triggered,
    }
}

pub fn abnormality_burden(significantly_abnormal: usize, moderately_abnormal: usize) -> f64 {
    (significantly_abnormal as f64 * SIGNIFICANT_BURDEN_WEIGHT
        + moderately_abnormal as f64 * MODERATE_BURDEN_WEIGHT)
        .min(1.0)
}

/// Velocity and trajectory for a (risk, burden) pair.
pub fn select(current_risk: f64, burden: f64) -> (f64, Trajectory) {
    let tier = POLICY
        .iter()
        .find(|t| current_risk >= t.min_risk)
        .unwrap_or(&POLICY[POLICY.len() - 1]);
    let band = tier
        .bands
        .iter()
        .find(|b| burden >= b.min_burden)
        .unwrap_or(&tier.bands[tier.bands.len() - 1]);
    (band.velocity.resolve(burden), band.trajectory)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub velocity: f64,
    pub trajectory: Trajectory,
    pub future_risk: f64,
}

pub fn project(current_risk: f64, burden: f64) -> Projection {
    let (velocity, trajectory) = select(current_risk, burden);
    Projection {
        velocity,
        trajectory,
        future_risk: (current_risk + velocity).clamp(0.0, 1.0),
    }
}

/// Risk output. `future_risk_6h` is `Some` iff `clinical_trigger_present`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskResult {
    pub current_risk: f64,
    pub future_risk_6h: Option<f64>,
    pub trajectory: Trajectory,
    pub risk_velocity: f64,
    pub abnormality_burden: f64,
    pub clinical_trigger_present: bool,
    pub vital_deviations: BTreeMap<String, f64>,
}

impl RiskResult {
    fn not_indicated(vital_deviations: BTreeMap<String, f64>) -> Self {
        Self {
            current_risk: 0.0,
            future_risk_6h: None,
            trajectory: Trajectory::NotIndicated,
            risk_velocity: 0.0,
            abnormality_burden: 0.0,
            clinical_trigger_present: false,
            vital_deviations,
        }
    }
}

/// Full trajectory computation from the model probability and key-vital deviations.
pub fn risk_trajectory(
    model_probability: f64,
    vital_deviations: BTreeMap<String, f64>,
) -> Result<RiskResult, EngineError> {
    let p = validate_probability(model_probability)?;
    let trigger = clinical_trigger(p, &vital_deviations);

    if !trigger.forecast_indicated() {
        return Ok(RiskResult::not_indicated(vital_deviations));
    }

    let burden = abnormality_burden(trigger.significantly_abnormal, trigger.moderately_abnormal);
    let current = blend(p, trigger.mean_deviation)?;
    let projection = project(current, burden);

    Ok(RiskResult {
        current_risk: current,
        future_risk_6h: Some(projection.future_risk),
        trajectory: projection.trajectory,
        risk_velocity: projection.velocity,
        abnormality_burden: burden,
        clinical_trigger_present: true,
        vital_deviations,
    })
}
