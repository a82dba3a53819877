//! Observation sets: decoding raw form/JSON fields into measured values.
//!
//! Rules:
//! - field names are matched case-insensitively against the canonical vocabulary,
//!   with aliases for long-form names (`Heart_Rate` → `HR`, ...);
//! - the vocabulary is the legacy feature list plus every parameter of the active
//!   range table; a table-only name resolves to the table's own spelling;
//! - unknown names are ignored;
//! - empty, non-numeric or non-finite values are "not measured" and simply absent.
//!
//! The legacy classifier feature vector is the one place where "not measured"
//! becomes `0.0` (see [`ObservationSet::legacy_feature_vector`]).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::ranges::RangeTable;

/// Features of the legacy 27-input sepsis classifier, in model order.
pub const LEGACY_FEATURES: [&str; 27] = [
    "HR",
    "O2Sat",
    "Temp",
    "SBP",
    "MAP",
    "DBP",
    "Resp",
    "BaseExcess",
    "HCO3",
    "FiO2",
    "PaCO2",
    "SaO2",
    "Creatinine",
    "Bilirubin_direct",
    "Glucose",
    "Lactate",
    "Magnesium",
    "Phosphate",
    "Bilirubin_total",
    "Hgb",
    "WBC",
    "Fibrinogen",
    "Platelets",
    "Age",
    "Gender",
    "HospAdmTime",
    "ICULOS",
];

/// Long-form field names → canonical names.
const ALIASES: [(&str, &str); 9] = [
    ("heart_rate", "HR"),
    ("temperature", "Temp"),
    ("systolic_bp", "SBP"),
    ("mean_arterial_pressure", "MAP"),
    ("diastolic_bp", "DBP"),
    ("respiration_rate", "Resp"),
    ("oxygen_saturation", "O2Sat"),
    ("haemoglobin", "Hgb"),
    ("hemoglobin", "Hgb"),
];

/// Resolve a raw field name to its canonical parameter name.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    let key = raw.trim();
    if key.is_empty() {
        return None;
    }
    if let Some(name) = LEGACY_FEATURES.iter().find(|f| f.eq_ignore_ascii_case(key)) {
        return Some(name);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(key))
        .map(|(_, canon)| *canon)
}

/// Parse a raw field value. Empty / malformed / non-finite ⇒ `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Measured values keyed by canonical parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationSet {
    values: BTreeMap<String, f64>,
    /// Range-table parameters outside the legacy vocabulary, in table spelling.
    #[serde(skip)]
    extra: Vec<String>,
    #[serde(skip)]
    ignored: usize,
}

impl ObservationSet {
    /// Empty set over the built-in vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set whose vocabulary also covers every parameter of `table`.
    pub fn for_table(table: &RangeTable) -> Self {
        let extra = table
            .iter()
            .filter(|(name, _)| canonical_name(name).is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        Self {
            extra,
            ..Self::default()
        }
    }

    /// Decode string fields (HTML form / query shape) over the built-in vocabulary.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::new().decode_fields(fields)
    }

    /// Decode string fields against the active range table.
    pub fn from_fields_in<I, K, V>(table: &RangeTable, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::for_table(table).decode_fields(fields)
    }

    /// Decode a JSON object whose values may be numbers, numeric strings or null.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::new().decode_json(map)
    }

    /// [`ObservationSet::from_json_map`] against the active range table.
    pub fn from_json_map_in(table: &RangeTable, map: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::for_table(table).decode_json(map)
    }

    fn decode_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (k, v) in fields {
            self.insert_raw(k.as_ref(), v.as_ref());
        }
        self
    }

    fn decode_json(mut self, map: &serde_json::Map<String, serde_json::Value>) -> Self {
        use serde_json::Value;
        for (k, v) in map {
            match v {
                Value::Number(n) => match n.as_f64() {
                    Some(x) => {
                        self.insert(k, x);
                    }
                    None => self.ignored += 1,
                },
                Value::String(s) => {
                    self.insert_raw(k, s);
                }
                Value::Null => {}
                _ => self.ignored += 1,
            }
        }
        self
    }

    /// Canonical spelling of `raw` in this set's vocabulary.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        if let Some(canon) = canonical_name(raw) {
            return Some(canon.to_string());
        }
        let key = raw.trim();
        self.extra.iter().find(|n| n.eq_ignore_ascii_case(key)).cloned()
    }

    /// Insert a raw string value; returns whether it was accepted.
    pub fn insert_raw(&mut self, name: &str, raw: &str) -> bool {
        match parse_value(raw) {
            Some(v) => self.insert(name, v),
            None => {
                if !raw.trim().is_empty() {
                    self.ignored += 1;
                }
                false
            }
        }
    }

    /// Insert a numeric value; unknown names and non-finite values are dropped.
    pub fn insert(&mut self, name: &str, value: f64) -> bool {
        match self.resolve(name) {
            Some(canon) if value.is_finite() => {
                self.values.insert(canon, value);
                true
            }
            _ => {
                self.ignored += 1;
                false
            }
        }
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields dropped during decoding (unknown name or malformed value).
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Classifier input in [`LEGACY_FEATURES`] order. Missing values become `0.0`
    /// here and only here; clinical range checks never see this vector.
    pub fn legacy_feature_vector(&self) -> [f64; 27] {
        let mut out = [0.0; 27];
        for (slot, name) in out.iter_mut().zip(LEGACY_FEATURES.iter()) {
            *slot = self.get(name).unwrap_or(0.0);
        }
        out
    }

    /// Short, non-reversible fingerprint for logs. Raw values are never logged.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for (k, v) in &self.values {
            hasher.update(k.as_bytes());
            hasher.update(v.to_bits().to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}
