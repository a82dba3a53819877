//! Probability sources: the injectable seam for the upstream sepsis probability.
//!
//! The engine never computes a model probability itself; it receives one from a
//! [`ProbabilitySource`]. Implementations here:
//! - [`FixedProbability`]: constant (rules-off deployments and test stubs);
//! - [`crate::sirs::SirsRuleScorer`]: SIRS + organ-dysfunction ladder;
//! - [`LogisticModel`]: standard-scaled logistic regression over the legacy
//!   27-feature vector, loaded from JSON;
//! - [`Calibrated`]: min/max probability rescaling around any other source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::blend::validate_probability;
use crate::observation::{ObservationSet, LEGACY_FEATURES};
use crate::sirs::SirsRuleScorer;

pub const ENV_SCORER_MODE: &str = "SCORER_MODE";
pub const ENV_SCORER_FIXED_PROBABILITY: &str = "SCORER_FIXED_PROBABILITY";
pub const ENV_SCORER_MODEL_PATH: &str = "SCORER_MODEL_PATH";
pub const DEFAULT_MODEL_PATH: &str = "config/model.json";

/// Trait object used by the API state and tests.
pub trait ProbabilitySource: Send + Sync {
    /// Source name for diagnostics/logs.
    fn name(&self) -> &'static str;
    /// Sepsis probability in [0,1] for one observation set.
    fn probability(&self, obs: &ObservationSet) -> Result<f64>;
}

/// Convenient alias used by callers.
pub type DynProbabilitySource = Arc<dyn ProbabilitySource>;

// ------------------------------------------------------------
// Fixed
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedProbability(f64);

impl FixedProbability {
    pub fn new(p: f64) -> Result<Self> {
        Ok(Self(validate_probability(p)?))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl ProbabilitySource for FixedProbability {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probability(&self, _obs: &ObservationSet) -> Result<f64> {
        Ok(self.0)
    }
}

// ------------------------------------------------------------
// Logistic model
// ------------------------------------------------------------

/// Serialized logistic-regression model with its standard scaler.
///
/// `z = intercept + Σ coef[i] * (x[i] - mean[i]) / scale[i]`, `p = 1 / (1 + e^-z)`.
/// Vectors follow [`LEGACY_FEATURES`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn validate(&self) -> Result<()> {
        let n = LEGACY_FEATURES.len();
        for (name, len) in [
            ("mean", self.mean.len()),
            ("scale", self.scale.len()),
            ("coefficients", self.coefficients.len()),
        ] {
            if len != n {
                bail!("model `{name}` has {len} entries, expected {n}");
            }
        }
        if let Some(i) = self.scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            bail!("model scale for `{}` must be finite and non-zero", LEGACY_FEATURES[i]);
        }
        let finite = self
            .mean
            .iter()
            .chain(self.coefficients.iter())
            .chain(std::iter::once(&self.intercept))
            .all(|v| v.is_finite());
        if !finite {
            bail!("model parameters must be finite");
        }
        Ok(())
    }

    pub fn score(&self, features: &[f64; 27]) -> f64 {
        let z = features
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .zip(&self.coefficients)
            .fold(self.intercept, |acc, (((x, m), s), c)| acc + c * (x - m) / s);
        1.0 / (1.0 + (-z).exp())
    }
}

impl ProbabilitySource for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic_model"
    }

    fn probability(&self, obs: &ObservationSet) -> Result<f64> {
        let p = self.score(&obs.legacy_feature_vector());
        if p.is_finite() {
            Ok(p)
        } else {
            Err(anyhow!("model produced a non-finite probability"))
        }
    }
}

// ------------------------------------------------------------
// Calibration
// ------------------------------------------------------------

/// Raw-probability range observed at training time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub prob_min: f64,
    pub prob_max: f64,
}

/// Rescales `inner` from `[prob_min, prob_max]` onto [0,1], then clamps.
#[derive(Debug, Clone)]
pub struct Calibrated<S> {
    inner: S,
    calibration: Calibration,
}

impl<S: ProbabilitySource> Calibrated<S> {
    pub fn new(inner: S, calibration: Calibration) -> Result<Self> {
        let Calibration { prob_min, prob_max } = calibration;
        if !(prob_min.is_finite() && prob_max.is_finite()) || prob_max <= prob_min {
            bail!("calibration requires finite prob_min < prob_max (got {prob_min}, {prob_max})");
        }
        Ok(Self { inner, calibration })
    }

    pub fn rescale(&self, p: f64) -> f64 {
        let Calibration { prob_min, prob_max } = self.calibration;
        ((p - prob_min) / (prob_max - prob_min)).clamp(0.0, 1.0)
    }
}

impl<S: ProbabilitySource> ProbabilitySource for Calibrated<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn probability(&self, obs: &ObservationSet) -> Result<f64> {
        Ok(self.rescale(self.inner.probability(obs)?))
    }
}

/// On-disk model file: the model plus an optional calibration block.
#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    #[serde(flatten)]
    model: LogisticModel,
    #[serde(default)]
    calibration: Option<Calibration>,
}

/// Load a model JSON file, wrapping it in [`Calibrated`] when it carries a calibration block.
pub fn load_model(path: &Path) -> Result<DynProbabilitySource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading model from {}", path.display()))?;
    let file: ModelFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing model {}", path.display()))?;
    file.model.validate()?;

    info!(
        target: "config",
        path = %path.display(),
        calibrated = file.calibration.is_some(),
        "probability model loaded"
    );
    Ok(match file.calibration {
        Some(c) => Arc::new(Calibrated::new(file.model, c)?),
        None => Arc::new(file.model),
    })
}

// ------------------------------------------------------------
// Factory
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerMode {
    Rules,
    Fixed,
    Model,
}

impl ScorerMode {
    /// Unknown values fall back to rules (with a warning).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rules" | "" => Self::Rules,
            "fixed" => Self::Fixed,
            "model" => Self::Model,
            other => {
                warn!(target: "config", mode = other, "unknown {ENV_SCORER_MODE}; using rules");
                Self::Rules
            }
        }
    }
}

/// Factory: build a probability source from environment variables.
///
/// * `SCORER_MODE=fixed` requires `SCORER_FIXED_PROBABILITY` in [0,1].
/// * `SCORER_MODE=model` loads `SCORER_MODEL_PATH` (default `config/model.json`).
/// * Anything else, or unset, gives the SIRS rule scorer.
pub fn build_probability_source() -> Result<DynProbabilitySource> {
    let mode = std::env::var(ENV_SCORER_MODE)
        .map(|v| ScorerMode::parse(&v))
        .unwrap_or(ScorerMode::Rules);

    let source: DynProbabilitySource = match mode {
        ScorerMode::Rules => Arc::new(SirsRuleScorer),
        ScorerMode::Fixed => {
            let raw = std::env::var(ENV_SCORER_FIXED_PROBABILITY)
                .with_context(|| format!("{ENV_SCORER_FIXED_PROBABILITY} is required in fixed mode"))?;
            let p: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_SCORER_FIXED_PROBABILITY}={raw:?} is not a number"))?;
            Arc::new(FixedProbability::new(p)?)
        }
        ScorerMode::Model => {
            let path = std::env::var(ENV_SCORER_MODEL_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));
            load_model(&path)?
        }
    };

    info!(target: "config", source = source.name(), "probability source ready");
    Ok(source)
}
