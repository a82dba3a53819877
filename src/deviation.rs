//! # Deviation Scorer
//! Continuous risk contribution in [0,1] for a single value against its range.
//!
//! - inside the normal band: linear from 0 at the optimal point, capped at 0.2;
//! - outside: linear from 0.2 at the band edge to 1.0 at the critical bound;
//! - degenerate or missing critical bound on the violated side: flat 0.5.

use std::collections::BTreeMap;

use crate::observation::{parse_value, ObservationSet};
use crate::ranges::{RangeDefinition, RangeTable};

/// Contribution at the normal-band edge.
pub const BAND_EDGE_RISK: f64 = 0.2;
/// Flat fallback when the critical bound coincides with (or is missing beyond) the band edge.
pub const DEGENERATE_RISK: f64 = 0.5;

/// Score a numeric value against a range definition.
pub fn score(value: f64, def: &RangeDefinition) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    if def.contains(value) {
        let half_band = (def.max - def.min) / 2.0;
        let r = (value - def.optimal).abs() / half_band * BAND_EDGE_RISK;
        return r.min(BAND_EDGE_RISK);
    }

    let (distance, span) = if value < def.min {
        (def.min - value, def.min - def.critical_low)
    } else {
        match def.critical_high {
            Some(high) => (value - def.max, high - def.max),
            None => (value - def.max, 0.0),
        }
    };

    if span <= 0.0 {
        return DEGENERATE_RISK;
    }
    (BAND_EDGE_RISK + distance / span * (1.0 - BAND_EDGE_RISK)).min(1.0)
}

/// `deviation_risk(value, parameter)`: unknown parameter or unparseable value → 0.0.
pub fn deviation_risk(table: &RangeTable, parameter: &str, raw: &str) -> f64 {
    match (table.get(parameter), parse_value(raw)) {
        (Some(def), Some(v)) => score(v, def),
        _ => 0.0,
    }
}

/// Deviations for the measured key vitals only; unmeasured ones are left out of the mean.
pub fn key_vital_deviations(
    obs: &ObservationSet,
    table: &RangeTable,
    key_vitals: &[String],
) -> BTreeMap<String, f64> {
    key_vitals
        .iter()
        .filter_map(|name| {
            let def = table.get(name)?;
            let value = obs.get(name)?;
            Some((name.clone(), score(value, def)))
        })
        .collect()
}
