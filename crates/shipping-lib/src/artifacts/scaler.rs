//! Standardization scaler
//!
//! Mirrors a standard scaler fitted offline: each column is centred by its
//! mean and divided by its standard deviation. Columns with zero variance
//! keep a scale of 1 so constant features do not blow up.

use super::{ArtifactSource, Scaler};
use crate::models::NUM_FEATURES;
use anyhow::{Context, Result};
use serde::Deserialize;

/// On-disk layout of a fitted scaler
#[derive(Debug, Deserialize)]
struct ScalerFile {
    #[serde(default)]
    mean: Option<Vec<f64>>,
    #[serde(default)]
    var: Option<Vec<f64>>,
    #[serde(default)]
    scale: Option<Vec<f64>>,
    #[serde(default = "default_true")]
    with_mean: bool,
    #[serde(default = "default_true")]
    with_std: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
    fitted: bool,
}

impl StandardScaler {
    /// Unfitted scaler that leaves features untouched
    pub fn identity() -> Self {
        Self {
            mean: [0.0; NUM_FEATURES],
            scale: [1.0; NUM_FEATURES],
            fitted: false,
        }
    }

    /// Build from per-column means and standard deviations
    pub fn new(mean: [f64; NUM_FEATURES], scale: [f64; NUM_FEATURES]) -> Self {
        Self {
            mean,
            scale: scale.map(|s| if s == 0.0 { 1.0 } else { s }),
            fitted: true,
        }
    }

    /// Build from per-column means and variances
    pub fn from_variance(mean: [f64; NUM_FEATURES], var: [f64; NUM_FEATURES]) -> Self {
        Self::new(mean, var.map(f64::sqrt))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: ScalerFile = serde_json::from_slice(bytes).context("Failed to parse scaler")?;

        let mean = if file.with_mean {
            let mean = file.mean.context("Scaler has no mean")?;
            to_row("mean", mean)?
        } else {
            [0.0; NUM_FEATURES]
        };

        let scale = if !file.with_std {
            [1.0; NUM_FEATURES]
        } else if let Some(scale) = file.scale {
            let scale = to_row("scale", scale)?;
            if scale.iter().any(|s| *s < 0.0) {
                anyhow::bail!("Scaler scale must be non-negative");
            }
            scale
        } else {
            let var = to_row("var", file.var.context("Scaler has neither scale nor var")?)?;
            if var.iter().any(|v| *v < 0.0) {
                anyhow::bail!("Scaler variance must be non-negative");
            }
            var.map(f64::sqrt)
        };

        Ok(Self::new(mean, scale))
    }

    pub fn load(source: &ArtifactSource) -> Result<Self> {
        let bytes = source.read()?;
        Self::from_json(&bytes).with_context(|| format!("Invalid scaler {}", source.path.display()))
    }
}

fn to_row(name: &str, values: Vec<f64>) -> Result<[f64; NUM_FEATURES]> {
    if values.iter().any(|v| !v.is_finite()) {
        anyhow::bail!("Scaler {} contains non-finite values", name);
    }
    let len = values.len();
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("Scaler {} has {} values, expected {}", name, len, NUM_FEATURES))
}

impl Scaler for StandardScaler {
    fn transform(&self, features: &[f64; NUM_FEATURES]) -> Result<[f64; NUM_FEATURES]> {
        let mut out = [0.0; NUM_FEATURES];
        for (i, value) in features.iter().enumerate() {
            out[i] = (value - self.mean[i]) / self.scale[i];
        }
        Ok(out)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
