//! Health and readiness reporting
//!
//! Artifact state is fixed at startup, so component health is derived from
//! the store rather than tracked over time. A missing artifact is reported as
//! degraded; requests are still served through the fallback paths.

use crate::artifacts::{ArtifactKind, ArtifactStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub loaded_at: i64,
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        if components
            .values()
            .any(|c| c.status == ComponentStatus::Degraded)
        {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reports artifact health for probes
#[derive(Clone)]
pub struct HealthReporter {
    store: Arc<ArtifactStore>,
    loaded_at: i64,
    ready: Arc<AtomicBool>,
}

impl HealthReporter {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            loaded_at: chrono::Utc::now().timestamp(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn health(&self) -> HealthResponse {
        let components: HashMap<String, ComponentHealth> = ArtifactKind::ALL
            .iter()
            .map(|kind| {
                let health = if self.store.is_loaded(*kind) {
                    ComponentHealth {
                        status: ComponentStatus::Healthy,
                        message: None,
                        loaded_at: self.loaded_at,
                    }
                } else {
                    ComponentHealth {
                        status: ComponentStatus::Degraded,
                        message: Some(format!("{} unavailable: {}", kind.as_str(), kind.degraded_behavior())),
                        loaded_at: self.loaded_at,
                    }
                };
                (kind.as_str().to_string(), health)
            })
            .collect();

        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub fn readiness(&self) -> ReadinessResponse {
        if self.ready.load(Ordering::SeqCst) {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{OrdinalEncoder, StandardScaler};

    #[test]
    fn test_all_artifacts_loaded_is_healthy() {
        let store = ArtifactStore::builder()
            .scaler(StandardScaler::identity())
            .encoder(OrdinalEncoder::new(["CDMX"]).unwrap())
            .model(StubModel)
            .build();
        let health = HealthReporter::new(Arc::new(store)).health();

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 3);
        assert!(health.components.values().all(|c| c.message.is_none()));
    }

    #[test]
    fn test_missing_artifact_is_degraded() {
        let store = ArtifactStore::builder()
            .encoder(OrdinalEncoder::new(["CDMX"]).unwrap())
            .build();
        let health = HealthReporter::new(Arc::new(store)).health();

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components["encoder"].status, ComponentStatus::Healthy);
        let model = &health.components["model"];
        assert_eq!(model.status, ComponentStatus::Degraded);
        assert!(model.message.as_deref().unwrap().contains("fallback"));
    }

    #[test]
    fn test_any_degraded_component_degrades_overall() {
        let component = |status| ComponentHealth { status, message: None, loaded_at: 0 };
        let mut components = HashMap::new();
        components.insert("a".to_string(), component(ComponentStatus::Healthy));
        assert_eq!(HealthResponse::compute_status(&components), ComponentStatus::Healthy);

        components.insert("b".to_string(), component(ComponentStatus::Degraded));
        assert_eq!(HealthResponse::compute_status(&components), ComponentStatus::Degraded);
    }

    #[test]
    fn test_readiness_follows_flag() {
        let reporter = HealthReporter::new(Arc::new(ArtifactStore::builder().build()));
        assert!(!reporter.readiness().ready);
        reporter.set_ready(true);
        assert!(reporter.readiness().ready);
        assert!(reporter.readiness().reason.is_none());
    }

    struct StubModel;

    impl crate::artifacts::Regressor for StubModel {
        fn predict(&self, _features: &[f64; crate::models::NUM_FEATURES]) -> anyhow::Result<f64> {
            Ok(1.0)
        }
    }
}
