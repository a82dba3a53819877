//! # Risk Blender
//! Current risk = 60% external model probability + 40% mean vital deviation.
//!
//! The model probability is an upstream contract: values outside [0,1] are
//! rejected, not clamped. Only the blended output is clamped.

use std::collections::BTreeMap;

use crate::error::EngineError;

pub const MODEL_WEIGHT: f64 = 0.6;
pub const VITALS_WEIGHT: f64 = 0.4;

/// Accept a probability only if it is finite and within [0,1].
pub fn validate_probability(p: f64) -> Result<f64, EngineError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(EngineError::invalid_probability(p))
    }
}

/// Mean of the computed deviations; `0.0` when nothing was measured.
pub fn vital_risk(deviations: &BTreeMap<String, f64>) -> f64 {
    if deviations.is_empty() {
        return 0.0;
    }
    deviations.values().sum::<f64>() / deviations.len() as f64
}

pub fn blend(model_probability: f64, vital_risk: f64) -> Result<f64, EngineError> {
    let p = validate_probability(model_probability)?;
    let v = if vital_risk.is_finite() { vital_risk } else { 0.0 };
    Ok((MODEL_WEIGHT * p + VITALS_WEIGHT * v).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_sixty_forty() {
        let b = blend(0.5, 1.0).unwrap();
        assert!((b - 0.7).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        for p in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(blend(p, 0.1), Err(EngineError::InvalidInput { .. })));
        }
        assert!(blend(0.0, 0.0).is_ok());
        assert!(blend(1.0, 1.0).is_ok());
    }

    #[test]
    fn mean_of_deviations() {
        let mut d = BTreeMap::new();
        assert_eq!(vital_risk(&d), 0.0);
        d.insert("HR".to_string(), 0.2);
        d.insert("Temp".to_string(), 0.6);
        assert!((vital_risk(&d) - 0.4).abs() < 1e-12);
    }
}
