//! # Label Classifier
//! Two independent taxonomies that are never merged:
//! - sepsis-risk bands from the model probability;
//! - clinical-instability bands from the rule-based severity score and abnormal count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SepsisRiskLabel {
    Low,
    Moderate,
    High,
    Critical,
}

impl SepsisRiskLabel {
    /// 0–20% Low, 21–50% Moderate, 51–75% High, above Critical.
    pub fn from_probability(probability: f64) -> Self {
        let pct = probability * 100.0;
        if pct <= 20.0 {
            Self::Low
        } else if pct <= 50.0 {
            Self::Moderate
        } else if pct <= 75.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low Sepsis Risk",
            Self::Moderate => "Moderate Sepsis Risk",
            Self::High => "High Sepsis Risk",
            Self::Critical => "Critical Sepsis Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstabilityLabel {
    Stable,
    Mild,
    Moderate,
    High,
}

impl InstabilityLabel {
    /// Either metric reaching 5 / 3 / 1 selects High / Moderate / Mild.
    pub fn from_counts(severity_score: u32, abnormal_count: usize) -> Self {
        let s = severity_score as usize;
        let n = abnormal_count;
        if s >= 5 || n >= 5 {
            Self::High
        } else if s >= 3 || n >= 3 {
            Self::Moderate
        } else if s >= 1 || n >= 1 {
            Self::Mild
        } else {
            Self::Stable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High Clinical Instability",
            Self::Moderate => "Moderate Clinical Instability",
            Self::Mild => "Mild Clinical Instability",
            Self::Stable => "Stable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sepsis_band_edges() {
        assert_eq!(SepsisRiskLabel::from_probability(0.0), SepsisRiskLabel::Low);
        assert_eq!(SepsisRiskLabel::from_probability(0.20), SepsisRiskLabel::Low);
        assert_eq!(SepsisRiskLabel::from_probability(0.21), SepsisRiskLabel::Moderate);
        assert_eq!(SepsisRiskLabel::from_probability(0.50), SepsisRiskLabel::Moderate);
        assert_eq!(SepsisRiskLabel::from_probability(0.51), SepsisRiskLabel::High);
        assert_eq!(SepsisRiskLabel::from_probability(0.75), SepsisRiskLabel::High);
        assert_eq!(SepsisRiskLabel::from_probability(0.76), SepsisRiskLabel::Critical);
        assert_eq!(SepsisRiskLabel::from_probability(1.0), SepsisRiskLabel::Critical);
    }

    #[test]
    fn instability_uses_either_metric() {
        assert_eq!(InstabilityLabel::from_counts(0, 0), InstabilityLabel::Stable);
        assert_eq!(InstabilityLabel::from_counts(1, 0), InstabilityLabel::Mild);
        assert_eq!(InstabilityLabel::from_counts(0, 3), InstabilityLabel::Moderate);
        assert_eq!(InstabilityLabel::from_counts(3, 0), InstabilityLabel::Moderate);
        assert_eq!(InstabilityLabel::from_counts(2, 5), InstabilityLabel::High);
        assert_eq!(InstabilityLabel::from_counts(5, 0), InstabilityLabel::High);
    }

    #[test]
    fn serialized_names_are_snake_case() {
        let v = serde_json::to_value(SepsisRiskLabel::Critical).unwrap();
        assert_eq!(v, serde_json::json!("critical"));
        let v = serde_json::to_value(InstabilityLabel::Mild).unwrap();
        assert_eq!(v, serde_json::json!("mild"));
    }
}
