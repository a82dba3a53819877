//! # SIRS rule scorer
//! Rules-only probability source: SIRS criteria, organ-dysfunction markers and a
//! count of clearly abnormal values, mapped onto a fixed probability ladder.
//!
//! All comparisons are strict (a value exactly on a cut-off does not count).

use serde::Serialize;

use crate::classifier::ProbabilitySource;
use crate::observation::ObservationSet;

/// Strict "outside" test against optional low/high cut-offs.
#[derive(Debug, Clone, Copy)]
struct Outside {
    below: Option<f64>,
    above: Option<f64>,
}

impl Outside {
    const fn band(below: f64, above: f64) -> Self {
        Self {
            below: Some(below),
            above: Some(above),
        }
    }
    const fn below(cut: f64) -> Self {
        Self {
            below: Some(cut),
            above: None,
        }
    }
    const fn above(cut: f64) -> Self {
        Self {
            below: None,
            above: Some(cut),
        }
    }

    fn hit(self, v: f64) -> bool {
        self.below.is_some_and(|b| v < b) || self.above.is_some_and(|a| v > a)
    }
}

struct Criterion {
    parameter: &'static str,
    sirs: Option<Outside>,
    abnormal: Outside,
    organ: Option<(Outside, &'static str)>,
}

static CRITERIA: [Criterion; 8] = [
    Criterion {
        parameter: "Temp",
        sirs: Some(Outside::band(36.0, 38.0)),
        abnormal: Outside::band(36.0, 38.0),
        organ: Some((Outside::band(34.0, 40.0), "Severe fever/hypothermia")),
    },
    Criterion {
        parameter: "HR",
        sirs: Some(Outside::band(60.0, 90.0)),
        abnormal: Outside::band(50.0, 100.0),
        organ: Some((Outside::band(40.0, 130.0), "Severe tachycardia/bradycardia")),
    },
    Criterion {
        parameter: "Resp",
        sirs: Some(Outside::above(20.0)),
        abnormal: Outside::above(22.0),
        organ: Some((Outside::above(30.0), "Severe tachypnea")),
    },
    Criterion {
        parameter: "WBC",
        sirs: Some(Outside::band(4.0, 12.0)),
        abnormal: Outside::band(3.0, 15.0),
        organ: None,
    },
    Criterion {
        parameter: "O2Sat",
        sirs: None,
        abnormal: Outside::below(93.0),
        organ: Some((Outside::below(93.0), "Hypoxemia")),
    },
    Criterion {
        parameter: "SBP",
        sirs: None,
        abnormal: Outside::below(90.0),
        organ: Some((Outside::below(90.0), "Hypotension")),
    },
    Criterion {
        parameter: "Lactate",
        sirs: None,
        abnormal: Outside::above(2.0),
        organ: Some((Outside::above(2.0), "Hyperlactatemia")),
    },
    Criterion {
        parameter: "Creatinine",
        sirs: None,
        abnormal: Outside::above(1.5),
        organ: Some((Outside::above(1.5), "Acute kidney dysfunction")),
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganDysfunction {
    pub parameter: &'static str,
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SirsFindings {
    pub sirs_count: usize,
    pub abnormality_count: usize,
    pub organ_dysfunction: Vec<OrganDysfunction>,
}

impl SirsFindings {
    /// Probability ladder, first match wins.
    pub fn probability(&self) -> f64 {
        let organ = self.organ_dysfunction.len();
        let sirs = self.sirs_count;
        let abn = self.abnormality_count;
        match () {
            _ if organ >= 3 => 0.95,
            _ if organ >= 2 => 0.85,
            _ if organ >= 1 && sirs >= 2 => 0.75,
            _ if organ >= 1 => 0.65,
            _ if sirs >= 3 && abn >= 4 => 0.60,
            _ if sirs >= 3 => 0.50,
            _ if sirs == 2 && abn >= 3 => 0.40,
            _ if sirs >= 2 => 0.25,
            _ => 0.05,
        }
    }
}

pub fn evaluate(obs: &ObservationSet) -> SirsFindings {
    let mut f = SirsFindings::default();
    for c in CRITERIA.iter() {
        let Some(v) = obs.get(c.parameter) else {
            continue;
        };
        if c.sirs.is_some_and(|s| s.hit(v)) {
            f.sirs_count += 1;
        }
        if c.abnormal.hit(v) {
            f.abnormality_count += 1;
        }
        if let Some((band, label)) = c.organ {
            if band.hit(v) {
                f.organ_dysfunction.push(OrganDysfunction {
                    parameter: c.parameter,
                    label,
                    value: v,
                });
            }
        }
    }
    f
}

/// Default probability source when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirsRuleScorer;

impl ProbabilitySource for SirsRuleScorer {
    fn name(&self) -> &'static str {
        "sirs_rules"
    }

    fn probability(&self, obs: &ObservationSet) -> anyhow::Result<f64> {
        Ok(evaluate(obs).probability())
    }
}
