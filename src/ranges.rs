//! # Range Table
//!
//! Reference data for physiological parameters:
//! - [`RangeDefinition`]: optimal value, normal band and critical bounds, used by the
//!   deviation scorer and the range-exceedance scan.
//! - [`CriticalThreshold`]: the narrower five-vital table used by the
//!   critical-threshold (instability) scan.
//!
//! Both tables are immutable once built. The built-in seed lives in
//! [`RangeTable::default_seed`] / [`CriticalThreshold::default_seed`]; deployments
//! override it through `config/clinical.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Normal band and critical bounds for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDefinition {
    pub optimal: f64,
    pub min: f64,
    pub max: f64,
    pub critical_low: f64,
    /// `None` when there is no "too high" (e.g. oxygen saturation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_high: Option<f64>,
    #[serde(default)]
    pub unit: String,
}

impl RangeDefinition {
    pub fn new(optimal: f64, min: f64, max: f64, critical_low: f64, critical_high: Option<f64>) -> Self {
        Self {
            optimal,
            min,
            max,
            critical_low,
            critical_high,
            unit: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Midpoint of the normal band; the exceedance scan ranks by distance from it.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    fn validate(&self, parameter: &str) -> Result<(), ConfigError> {
        let bad = |reason: &str| ConfigError::InvalidRange {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        };

        let finite = [self.optimal, self.min, self.max, self.critical_low]
            .iter()
            .chain(self.critical_high.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(bad("all bounds must be finite numbers"));
        }
        if self.min >= self.max {
            return Err(bad("normal band min must be below max"));
        }
        if !self.contains(self.optimal) {
            return Err(bad("optimal value must lie inside the normal band"));
        }
        if self.critical_low > self.min {
            return Err(bad("critical_low must not exceed the normal band min"));
        }
        if let Some(high) = self.critical_high {
            if high < self.max {
                return Err(bad("critical_high must not be below the normal band max"));
            }
        }
        Ok(())
    }
}

/// Parameter name → [`RangeDefinition`]. Lookups are by canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    entries: BTreeMap<String, RangeDefinition>,
}

impl RangeTable {
    pub fn new(entries: BTreeMap<String, RangeDefinition>) -> Result<Self, ConfigError> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    /// Check every definition; tables deserialized from config go through here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, def) in &self.entries {
            def.validate(name)?;
        }
        Ok(())
    }

    pub fn get(&self, parameter: &str) -> Option<&RangeDefinition> {
        self.entries.get(parameter)
    }

    /// Add or replace one parameter; the definition is validated first.
    pub fn insert(&mut self, parameter: impl Into<String>, def: RangeDefinition) -> Result<(), ConfigError> {
        let parameter = parameter.into();
        def.validate(&parameter)?;
        self.entries.insert(parameter, def);
        Ok(())
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.entries.contains_key(parameter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RangeDefinition)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in reference ranges.
    ///
    /// Where older rule sets disagreed on a normal band, the narrower band is kept
    /// (SBP 90–120, DBP 60–80, creatinine 0.7–1.2).
    pub fn default_seed() -> Self {
        let mut entries = BTreeMap::new();
        for (name, def) in [
            ("HR", RangeDefinition::new(70.0, 60.0, 100.0, 40.0, Some(150.0)).with_unit("bpm")),
            ("Temp", RangeDefinition::new(37.0, 36.5, 37.5, 35.0, Some(40.0)).with_unit("°C")),
            ("SBP", RangeDefinition::new(110.0, 90.0, 120.0, 70.0, Some(200.0)).with_unit("mmHg")),
            ("MAP", RangeDefinition::new(85.0, 70.0, 100.0, 50.0, Some(150.0)).with_unit("mmHg")),
            ("DBP", RangeDefinition::new(70.0, 60.0, 80.0, 40.0, Some(120.0)).with_unit("mmHg")),
            ("Resp", RangeDefinition::new(16.0, 12.0, 20.0, 8.0, Some(40.0)).with_unit("breaths/min")),
            ("O2Sat", RangeDefinition::new(97.0, 95.0, 100.0, 88.0, None).with_unit("%")),
            ("Glucose", RangeDefinition::new(85.0, 70.0, 100.0, 40.0, Some(300.0)).with_unit("mg/dL")),
            ("Lactate", RangeDefinition::new(1.2, 0.5, 2.0, 0.2, Some(10.0)).with_unit("mmol/L")),
            ("WBC", RangeDefinition::new(7.0, 4.5, 11.0, 1.0, Some(50.0)).with_unit("K/uL")),
            ("Creatinine", RangeDefinition::new(1.0, 0.7, 1.2, 0.3, Some(3.0)).with_unit("mg/dL")),
            ("Hgb", RangeDefinition::new(15.5, 13.5, 17.5, 7.0, Some(20.0)).with_unit("g/dL")),
            ("HCO3", RangeDefinition::new(24.0, 22.0, 26.0, 10.0, Some(40.0)).with_unit("mEq/L")),
        ] {
            entries.insert(name.to_string(), def);
        }
        Self { entries }
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

/// One row of the critical-threshold (instability) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalThreshold {
    pub parameter: String,
    pub normal_min: f64,
    pub normal_max: f64,
    pub critical_low: Option<f64>,
    #[serde(default)]
    pub critical_high: Option<f64>,
}

impl CriticalThreshold {
    pub fn new(
        parameter: impl Into<String>,
        normal: (f64, f64),
        critical_low: Option<f64>,
        critical_high: Option<f64>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            normal_min: normal.0,
            normal_max: normal.1,
            critical_low,
            critical_high,
        }
    }

    /// At or beyond either critical bound.
    pub fn is_critical(&self, value: f64) -> bool {
        self.critical_low.is_some_and(|low| value <= low)
            || self.critical_high.is_some_and(|high| value >= high)
    }

    pub fn is_outside_normal(&self, value: f64) -> bool {
        value < self.normal_min || value > self.normal_max
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let bad = |reason: &str| ConfigError::InvalidThreshold {
            parameter: self.parameter.clone(),
            reason: reason.to_string(),
        };
        if !(self.normal_min.is_finite() && self.normal_max.is_finite()) {
            return Err(bad("normal band must be finite"));
        }
        if self.normal_min >= self.normal_max {
            return Err(bad("normal band min must be below max"));
        }
        if self.critical_low.is_some_and(|low| !low.is_finite() || low > self.normal_min) {
            return Err(bad("critical_low must be finite and not above the normal band"));
        }
        if self.critical_high.is_some_and(|high| !high.is_finite() || high < self.normal_max) {
            return Err(bad("critical_high must be finite and not below the normal band"));
        }
        Ok(())
    }

    /// The five monitored vitals. O2Sat has no critical high: 100% is normal.
    pub fn default_seed() -> Vec<Self> {
        vec![
            Self::new("HR", (60.0, 100.0), Some(40.0), Some(130.0)),
            Self::new("O2Sat", (95.0, 100.0), Some(88.0), None),
            Self::new("Temp", (36.5, 37.5), Some(35.0), Some(40.0)),
            Self::new("SBP", (90.0, 140.0), Some(70.0), Some(180.0)),
            Self::new("Resp", (12.0, 20.0), Some(8.0), Some(30.0)),
        ]
    }
}

/// Parameters averaged into the vital-deviation signal used by the blender.
pub const DEFAULT_KEY_VITALS: [&str; 9] = [
    "HR", "Temp", "SBP", "MAP", "Resp", "O2Sat", "Glucose", "Lactate", "WBC",
];
