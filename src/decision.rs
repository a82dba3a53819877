//! decision.rs: the assessment output (status, both labels, recommendation,
//! explainability reasons and top abnormal contributors).
//!
//! Note: the sepsis label and the instability label are independent; neither is
//! derived from the other and the reasons list names both.

use serde::{Deserialize, Serialize};

use crate::abnormality::{AbnormalityReport, Direction, RangeExceedance};
use crate::labels::{InstabilityLabel, SepsisRiskLabel};
use crate::trajectory::RiskResult;

/// Cap on listed contributors.
pub const MAX_CONTRIBUTORS: usize = 8;

/// Probability at or above which the patient is reported as sepsis-prone.
pub const PRONE_PROBABILITY: f64 = 0.5;
/// Severity score or abnormal count at which a non-prone patient is unstable.
pub const UNSTABLE_THRESHOLD: usize = 3;

/// Overall call for the observation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Prone,
    Unstable,
    NotProne,
}

impl PredictionStatus {
    pub fn from_findings(model_probability: f64, severity_score: u32, abnormal_count: usize) -> Self {
        if model_probability >= PRONE_PROBABILITY {
            Self::Prone
        } else if severity_score as usize >= UNSTABLE_THRESHOLD || abnormal_count >= UNSTABLE_THRESHOLD {
            Self::Unstable
        } else {
            Self::NotProne
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Prone => "Immediate clinical evaluation recommended. Consider sepsis protocols.",
            Self::Unstable => {
                "Investigate underlying cause of instability. Do NOT initiate sepsis protocols based on vitals alone."
            }
            Self::NotProne => "Continue routine clinical monitoring.",
        }
    }
}

/// Human-readable explanation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub message: String,
    /// Optional weight in <0.0, 1.0>.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReasonKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    SepsisRisk,
    Instability,
    CriticalVital,
    Trajectory,
}

impl Reason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            weight: None,
            kind: None,
        }
    }

    pub fn weighted(mut self, w: f64) -> Self {
        self.weight = Some(clamp01(w));
        self
    }

    pub fn kind(mut self, kind: ReasonKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Out-of-range value listed as evidence, worst first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub parameter: String,
    pub value: f64,
    pub direction: Direction,
    pub normal_min: f64,
    pub normal_max: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
}

impl From<&RangeExceedance> for Contributor {
    fn from(e: &RangeExceedance) -> Self {
        Self {
            parameter: e.parameter.clone(),
            value: e.value,
            direction: e.direction,
            normal_min: e.normal_min,
            normal_max: e.normal_max,
            unit: e.unit.clone(),
        }
    }
}

/// Complete, structured assessment. Rendering is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub status: PredictionStatus,
    pub model_probability: f64,
    pub sepsis_label: SepsisRiskLabel,
    pub instability_label: InstabilityLabel,
    pub recommendation: String,
    pub risk: RiskResult,
    pub abnormalities: AbnormalityReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<Reason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_contributors: Vec<Contributor>,
}

impl Assessment {
    /// Skeleton with status, labels and recommendation filled in; no reasons yet.
    pub fn new(model_probability: f64, risk: RiskResult, abnormalities: AbnormalityReport) -> Self {
        let abnormal_count = abnormalities.abnormal_count();
        let status =
            PredictionStatus::from_findings(model_probability, abnormalities.severity_score, abnormal_count);
        Self {
            status,
            model_probability,
            sepsis_label: SepsisRiskLabel::from_probability(model_probability),
            instability_label: InstabilityLabel::from_counts(abnormalities.severity_score, abnormal_count),
            recommendation: status.recommendation().to_string(),
            risk,
            abnormalities,
            reasons: Vec::new(),
            top_contributors: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reasons.push(reason);
        self
    }

    pub fn with_contributor(mut self, c: Contributor) -> Self {
        self.top_contributors.push(c);
        self
    }
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
