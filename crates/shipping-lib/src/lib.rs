//! Shipping cost inference library
//!
//! This crate provides the core functionality for:
//! - Loading the scaler, encoder and model artifacts with graceful degradation
//! - Validating quote requests and assembling feature vectors
//! - Predicting shipping costs, with a tiered fallback when no model is loaded
//! - Health reporting and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;

pub use artifacts::{ArtifactKind, ArtifactPaths, ArtifactSource, ArtifactStatus, ArtifactStore};
pub use error::{QuoteError, QuoteResult};
pub use health::{ComponentHealth, ComponentStatus, HealthReporter, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{QuoteMetrics, StructuredLogger};
pub use pipeline::{PricedOrder, QuotePipeline};
