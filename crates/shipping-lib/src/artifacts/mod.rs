//! Pre-trained artifacts used by the quote pipeline
//!
//! Each artifact (scaler, encoder, model) is loaded independently at startup.
//! A failure to load one never prevents loading the others; the store records
//! the outcome and the pipeline compensates for whatever is missing:
//! - scaler: an unfitted identity scaler passes features through unchanged
//! - encoder: `estado` is encoded as `0`
//! - model: the tiered heuristic in [`crate::pipeline::FallbackTiers`]
//!
//! Nothing in the store is mutated after construction, so it can be shared
//! across request handlers behind an `Arc` without locking.

mod encoder;
mod forest;
mod model;
mod scaler;

pub use encoder::OrdinalEncoder;
pub use forest::ForestRegressor;
pub use model::OnnxRegressor;
pub use scaler::StandardScaler;

use crate::models::NUM_FEATURES;
use crate::observability::StructuredLogger;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const DEFAULT_SCALER_FILE: &str = "scaler_gis.json";
pub const DEFAULT_ENCODER_FILE: &str = "ordinal_encoder_estado.json";
pub const DEFAULT_MODEL_FILE: &str = "randomforest_model.json";

/// Feature normalization transform
pub trait Scaler: Send + Sync {
    /// Transform a feature row laid out in fitting order
    fn transform(&self, features: &[f64; NUM_FEATURES]) -> Result<[f64; NUM_FEATURES]>;

    /// False for the identity scaler substituted when loading fails
    fn is_fitted(&self) -> bool;
}

/// Categorical encoder for the `estado` column
pub trait Encoder: Send + Sync {
    /// Numeric code for a category, `None` if the category is unknown
    fn encode(&self, category: &str) -> Option<f64>;
}

/// Regression model producing a single shipping cost
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> Result<f64>;
}

/// The three artifact slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Scaler,
    Encoder,
    Model,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Scaler,
        ArtifactKind::Encoder,
        ArtifactKind::Model,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Encoder => "encoder",
            ArtifactKind::Model => "model",
        }
    }

    /// How requests are served while this artifact is unavailable
    pub fn degraded_behavior(&self) -> &'static str {
        match self {
            ArtifactKind::Scaler => "features are used unscaled",
            ArtifactKind::Encoder => "estado is encoded as 0",
            ArtifactKind::Model => "cost comes from the num_items tier fallback",
        }
    }
}

/// Location of one artifact plus an optional expected digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub path: PathBuf,
    /// Hex-encoded SHA-256 the file must match, if configured
    pub sha256: Option<String>,
}

impl ArtifactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Read the file and verify its digest
    pub fn read(&self) -> Result<Vec<u8>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        if let Some(expected) = &self.sha256 {
            let computed = compute_checksum(&bytes);
            if !computed.eq_ignore_ascii_case(expected.trim()) {
                anyhow::bail!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    self.path.display(),
                    expected,
                    computed
                );
            }
        }

        Ok(bytes)
    }
}

/// Where to find each artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub scaler: ArtifactSource,
    pub encoder: ArtifactSource,
    pub model: ArtifactSource,
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler: ArtifactSource::new(dir.join(DEFAULT_SCALER_FILE)),
            encoder: ArtifactSource::new(dir.join(DEFAULT_ENCODER_FILE)),
            model: ArtifactSource::new(dir.join(DEFAULT_MODEL_FILE)),
        }
    }

    fn source(&self, kind: ArtifactKind) -> &ArtifactSource {
        match kind {
            ArtifactKind::Scaler => &self.scaler,
            ArtifactKind::Encoder => &self.encoder,
            ArtifactKind::Model => &self.model,
        }
    }
}

/// Outcome of loading one artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub loaded: bool,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Immutable set of artifacts shared by all requests
pub struct ArtifactStore {
    scaler: Box<dyn Scaler>,
    encoder: Option<Box<dyn Encoder>>,
    model: Option<Box<dyn Regressor>>,
    statuses: Vec<ArtifactStatus>,
}

impl ArtifactStore {
    /// Load every artifact once, logging one line per artifact.
    ///
    /// Never fails: an artifact that cannot be loaded is recorded as absent.
    pub fn load(paths: &ArtifactPaths, logger: &StructuredLogger) -> Self {
        let mut statuses = Vec::with_capacity(ArtifactKind::ALL.len());

        let scaler = attempt(
            paths,
            ArtifactKind::Scaler,
            logger,
            &mut statuses,
            StandardScaler::load,
        );
        let encoder = attempt(
            paths,
            ArtifactKind::Encoder,
            logger,
            &mut statuses,
            OrdinalEncoder::load,
        );
        let model = attempt(
            paths,
            ArtifactKind::Model,
            logger,
            &mut statuses,
            load_regressor,
        );

        Self {
            scaler: match scaler {
                Some(s) => Box::new(s),
                None => Box::new(StandardScaler::identity()),
            },
            encoder: encoder.map(|e| Box::new(e) as Box<dyn Encoder>),
            model,
            statuses,
        }
    }

    /// Assemble a store from already constructed artifacts
    pub fn builder() -> ArtifactStoreBuilder {
        ArtifactStoreBuilder::default()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn encoder(&self) -> Option<&dyn Encoder> {
        self.encoder.as_deref()
    }

    pub fn model(&self) -> Option<&dyn Regressor> {
        self.model.as_deref()
    }

    pub fn statuses(&self) -> &[ArtifactStatus] {
        &self.statuses
    }

    pub fn is_loaded(&self, kind: ArtifactKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind && s.loaded)
    }
}

/// Load the model in the format named by its extension: `.onnx` graphs run
/// through tract, anything else is read as a JSON forest.
pub fn load_regressor(source: &ArtifactSource) -> Result<Box<dyn Regressor>> {
    let is_onnx = source
        .path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));

    if is_onnx {
        Ok(Box::new(OnnxRegressor::load(source)?))
    } else {
        Ok(Box::new(ForestRegressor::load(source)?))
    }
}

fn attempt<T>(
    paths: &ArtifactPaths,
    kind: ArtifactKind,
    logger: &StructuredLogger,
    statuses: &mut Vec<ArtifactStatus>,
    load: impl FnOnce(&ArtifactSource) -> Result<T>,
) -> Option<T> {
    let source = paths.source(kind);
    let display = source.path.display().to_string();

    match load(source) {
        Ok(artifact) => {
            logger.log_artifact_loaded(kind, &display);
            statuses.push(ArtifactStatus {
                kind,
                loaded: true,
                source: display,
                error: None,
            });
            Some(artifact)
        }
        Err(e) => {
            let error = format!("{:#}", e);
            logger.log_artifact_unavailable(kind, &display, &error);
            statuses.push(ArtifactStatus {
                kind,
                loaded: false,
                source: display,
                error: Some(error),
            });
            None
        }
    }
}

/// Builder for stores made of in-memory artifacts
#[derive(Default)]
pub struct ArtifactStoreBuilder {
    scaler: Option<Box<dyn Scaler>>,
    encoder: Option<Box<dyn Encoder>>,
    model: Option<Box<dyn Regressor>>,
}

impl ArtifactStoreBuilder {
    pub fn scaler(mut self, scaler: impl Scaler + 'static) -> Self {
        self.scaler = Some(Box::new(scaler));
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn model(mut self, model: impl Regressor + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    pub fn build(self) -> ArtifactStore {
        let status = |kind, loaded: bool| ArtifactStatus {
            kind,
            loaded,
            source: "in-memory".to_string(),
            error: None,
        };
        let statuses = vec![
            status(ArtifactKind::Scaler, self.scaler.is_some()),
            status(ArtifactKind::Encoder, self.encoder.is_some()),
            status(ArtifactKind::Model, self.model.is_some()),
        ];

        ArtifactStore {
            scaler: self
                .scaler
                .unwrap_or_else(|| Box::new(StandardScaler::identity())),
            encoder: self.encoder,
            model: self.model,
            statuses,
        }
    }
}

/// Hex-encoded SHA-256 of `data`
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
