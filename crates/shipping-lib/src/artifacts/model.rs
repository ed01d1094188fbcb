//! ONNX inference using tract
//!
//! For regression graphs built from standard ONNX operators (linear models,
//! small MLPs). Tree ensembles from the `ai.onnx.ml` domain are not supported
//! by tract; those are exported as JSON and run by
//! [`ForestRegressor`](super::ForestRegressor).

use super::{ArtifactSource, Regressor};
use crate::models::NUM_FEATURES;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-backed regression model
pub struct OnnxRegressor {
    model: TractModel,
}

impl OnnxRegressor {
    /// Parse and optimize a model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model })
    }

    pub fn load(source: &ArtifactSource) -> Result<Self> {
        let bytes = source.read()?;
        Self::from_bytes(&bytes).with_context(|| format!("Invalid model {}", source.path.display()))
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> Result<f64> {
        let start = Instant::now();

        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Failed to shape model input")?
            .into();

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let value = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model output is empty")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value as f64)
    }
}
