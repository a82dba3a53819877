//! # Abnormality Detector
//!
//! Two independent scans over the same observation set:
//! - **range exceedance**: every range-table parameter outside its normal band,
//!   tagged HIGH/LOW, sorted worst-first by distance from the band midpoint;
//! - **critical threshold**: the five monitored vitals, tagged CRITICAL (weight 3)
//!   or ABNORMAL (weight 1). The weights sum into the severity score.
//!
//! Note: the critical scan skips a value of exactly `0.0` as "not measured", so a
//! true zero reading cannot be told apart from absence.

use serde::{Deserialize, Serialize};

use crate::observation::ObservationSet;
use crate::ranges::{CriticalThreshold, RangeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    High,
    Low,
}

/// A parameter outside its normal band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeExceedance {
    pub parameter: String,
    pub value: f64,
    pub direction: Direction,
    /// Signed distance to the violated bound (positive above max, negative below min).
    pub delta: f64,
    pub normal_min: f64,
    pub normal_max: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Outside the normal band but not at a critical bound.
    Abnormal,
    Critical,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Severity::Abnormal => 1,
            Severity::Critical => 3,
        }
    }
}

/// Severity-tagged vital-sign finding from the critical scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstabilityIndicator {
    pub parameter: String,
    pub value: f64,
    pub severity: Severity,
    pub description: String,
}

/// Combined output of both scans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbnormalityReport {
    pub exceedances: Vec<RangeExceedance>,
    pub indicators: Vec<InstabilityIndicator>,
    pub severity_score: u32,
    pub has_instability: bool,
}

impl AbnormalityReport {
    /// Number of out-of-range values (the "abnormal count" used by labels).
    pub fn abnormal_count(&self) -> usize {
        self.exceedances.len()
    }

    pub fn critical(&self) -> impl Iterator<Item = &InstabilityIndicator> {
        self.indicators
            .iter()
            .filter(|i| i.severity == Severity::Critical)
    }
}

/// Range-exceedance scan, worst-first.
pub fn range_exceedances(obs: &ObservationSet, table: &RangeTable) -> Vec<RangeExceedance> {
    let mut out: Vec<(f64, RangeExceedance)> = table
        .iter()
        .filter_map(|(name, def)| {
            let value = obs.get(name)?;
            let (direction, delta) = if value > def.max {
                (Direction::High, value - def.max)
            } else if value < def.min {
                (Direction::Low, value - def.min)
            } else {
                return None;
            };
            let rank = (value - def.midpoint()).abs();
            Some((
                rank,
                RangeExceedance {
                    parameter: name.to_string(),
                    value,
                    direction,
                    delta,
                    normal_min: def.min,
                    normal_max: def.max,
                    unit: def.unit.clone(),
                },
            ))
        })
        .collect();

    out.sort_by(|a, b| b.0.total_cmp(&a.0));
    out.into_iter().map(|(_, e)| e).collect()
}

/// Critical-threshold scan; returns indicators and the summed severity score.
pub fn critical_scan(
    obs: &ObservationSet,
    thresholds: &[CriticalThreshold],
) -> (Vec<InstabilityIndicator>, u32) {
    let mut indicators = Vec::new();
    let mut score = 0;

    for t in thresholds {
        let value = match obs.get(&t.parameter) {
            Some(v) if v != 0.0 => v,
            _ => continue,
        };

        let severity = if t.is_critical(value) {
            Severity::Critical
        } else if t.is_outside_normal(value) {
            Severity::Abnormal
        } else {
            continue;
        };

        let description = match severity {
            Severity::Critical => format!("{} is critically abnormal ({:.1})", t.parameter, value),
            Severity::Abnormal => format!("{} is outside normal range ({:.1})", t.parameter, value),
        };
        score += severity.weight();
        indicators.push(InstabilityIndicator {
            parameter: t.parameter.clone(),
            value,
            severity,
            description,
        });
    }

    (indicators, score)
}

/// Run both scans.
pub fn detect(
    obs: &ObservationSet,
    table: &RangeTable,
    thresholds: &[CriticalThreshold],
) -> AbnormalityReport {
    let exceedances = range_exceedances(obs, table);
    let (indicators, severity_score) = critical_scan(obs, thresholds);
    AbnormalityReport {
        exceedances,
        indicators,
        severity_score,
        has_instability: severity_score > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> (RangeTable, Vec<CriticalThreshold>) {
        (RangeTable::default_seed(), CriticalThreshold::default_seed())
    }

    #[test]
    fn normal_patient_has_no_findings() {
        let (t, c) = seed();
        let obs = ObservationSet::new()
            .with("HR", 72.0)
            .with("Temp", 37.0)
            .with("SBP", 110.0)
            .with("O2Sat", 98.0)
            .with("Resp", 16.0);
        let r = detect(&obs, &t, &c);
        assert!(r.exceedances.is_empty());
        assert!(r.indicators.is_empty());
        assert_eq!(r.severity_score, 0);
        assert!(!r.has_instability);
    }

    #[test]
    fn febrile_tachycardic_patient() {
        let (t, c) = seed();
        let obs = ObservationSet::new()
            .with("HR", 130.0)
            .with("Temp", 39.2)
            .with("SBP", 95.0)
            .with("O2Sat", 92.0);
        let r = detect(&obs, &t, &c);

        // HR critical (3) + Temp abnormal (1) + O2Sat abnormal (1)
        assert_eq!(r.severity_score, 5);
        assert_eq!(r.critical().count(), 1);
        assert_eq!(r.critical().next().unwrap().parameter, "HR");

        let names: Vec<_> = r.exceedances.iter().map(|e| e.parameter.as_str()).collect();
        // worst-first by distance from the band midpoint: HR 50, O2Sat 5.5, Temp 2.2
        assert_eq!(names, vec!["HR", "O2Sat", "Temp"]);
        assert_eq!(r.exceedances[0].direction, Direction::High);
        assert!((r.exceedances[0].delta - 30.0).abs() < 1e-9);
        assert_eq!(r.exceedances[1].direction, Direction::Low);
        assert!((r.exceedances[1].delta + 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_is_skipped_by_critical_scan_only() {
        let (t, c) = seed();
        let obs = ObservationSet::new().with("HR", 0.0);
        let r = detect(&obs, &t, &c);
        assert!(r.indicators.is_empty());
        assert_eq!(r.exceedances.len(), 1);
    }

    #[test]
    fn o2sat_at_100_is_not_critical() {
        let (t, c) = seed();
        let obs = ObservationSet::new().with("O2Sat", 100.0);
        assert_eq!(detect(&obs, &t, &c).severity_score, 0);
    }

    #[test]
    fn critical_low_counts_as_critical() {
        let (t, c) = seed();
        let obs = ObservationSet::new().with("SBP", 70.0).with("Resp", 8.0);
        let r = detect(&obs, &t, &c);
        assert_eq!(r.severity_score, 6);
    }
}
