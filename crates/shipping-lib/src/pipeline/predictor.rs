//! Cost prediction with a fixed-tier fallback

use crate::artifacts::ArtifactStore;
use crate::error::{QuoteError, QuoteResult};
use crate::models::{CostSource, FeatureVector, ShippingCost};
use anyhow::Context;
use std::sync::Arc;
use tracing::warn;

/// Orders up to this many items fall in the cheapest tier
pub const SMALL_ORDER_MAX_ITEMS: f64 = 3.0;
/// Orders up to this many items (and above the small tier) fall in the middle tier
pub const MEDIUM_ORDER_MAX_ITEMS: f64 = 6.0;

pub const SMALL_ORDER_COST: f64 = 150.0;
pub const MEDIUM_ORDER_COST: f64 = 200.0;
pub const LARGE_ORDER_COST: f64 = 300.0;

/// Heuristic used when no model is loaded. Only `num_items` matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTiers;

impl FallbackTiers {
    pub fn cost_for(num_items: f64) -> f64 {
        if num_items <= SMALL_ORDER_MAX_ITEMS {
            SMALL_ORDER_COST
        } else if num_items <= MEDIUM_ORDER_MAX_ITEMS {
            MEDIUM_ORDER_COST
        } else {
            LARGE_ORDER_COST
        }
    }
}

/// Runs the scaler and model over a feature vector
pub struct CostPredictor {
    store: Arc<ArtifactStore>,
}

impl CostPredictor {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn predict(&self, vector: &FeatureVector) -> QuoteResult<ShippingCost> {
        let row = vector.to_array();

        let scaler = self.store.scaler();
        let input = if scaler.is_fitted() {
            scaler.transform(&row).context("Scaler transform failed")?
        } else {
            row
        };

        let Some(model) = self.store.model() else {
            return Ok(ShippingCost {
                value: FallbackTiers::cost_for(vector.num_items),
                source: CostSource::Fallback,
            });
        };

        let value = model.predict(&input).context("Model prediction failed")?;
        if !value.is_finite() {
            return Err(QuoteError::Internal(anyhow::anyhow!(
                "Model returned non-finite value {}",
                value
            )));
        }

        let value = if value < 0.0 {
            warn!(raw_prediction = value, "Model predicted a negative cost, clamping to 0");
            0.0
        } else {
            value
        };

        Ok(ShippingCost {
            value,
            source: CostSource::Model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{Regressor, StandardScaler};
    use crate::models::NUM_FEATURES;

    struct ConstantModel(f64);

    impl Regressor for ConstantModel {
        fn predict(&self, _features: &[f64; NUM_FEATURES]) -> anyhow::Result<f64> {
            Ok(self.0)
        }
    }

    /// Returns the first scaled feature so tests can see what the model received
    struct EchoFirstFeature;

    impl Regressor for EchoFirstFeature {
        fn predict(&self, features: &[f64; NUM_FEATURES]) -> anyhow::Result<f64> {
            Ok(features[0])
        }
    }

    struct BrokenModel;

    impl Regressor for BrokenModel {
        fn predict(&self, _features: &[f64; NUM_FEATURES]) -> anyhow::Result<f64> {
            anyhow::bail!("tree ensemble corrupted")
        }
    }

    fn vector(num_items: f64) -> FeatureVector {
        FeatureVector {
            total_quantity: 12.0,
            total: 550.0,
            subtotal: 500.0,
            num_items,
            estado_encoded: 4.0,
        }
    }

    #[test]
    fn test_fallback_tier_boundaries() {
        let predictor = CostPredictor::new(Arc::new(ArtifactStore::builder().build()));
        let expected = [
            (0.0, 150.0),
            (1.0, 150.0),
            (2.0, 150.0),
            (3.0, 150.0),
            (4.0, 200.0),
            (5.0, 200.0),
            (6.0, 200.0),
            (7.0, 300.0),
            (10.0, 300.0),
            (1000.0, 300.0),
        ];
        for (num_items, cost) in expected {
            let result = predictor.predict(&vector(num_items)).unwrap();
            assert_eq!(result.value, cost, "num_items = {}", num_items);
            assert_eq!(result.source, CostSource::Fallback);
        }
    }

    #[test]
    fn test_fallback_ignores_other_features() {
        let predictor = CostPredictor::new(Arc::new(ArtifactStore::builder().build()));
        let mut v = vector(5.0);
        v.total = 1_000_000.0;
        v.estado_encoded = 31.0;
        assert_eq!(predictor.predict(&v).unwrap().value, MEDIUM_ORDER_COST);
    }

    #[test]
    fn test_model_output_is_returned() {
        let store = ArtifactStore::builder().model(ConstantModel(187.25)).build();
        let cost = CostPredictor::new(Arc::new(store)).predict(&vector(10.0)).unwrap();
        assert_eq!(cost.value, 187.25);
        assert_eq!(cost.source, CostSource::Model);
    }

    #[test]
    fn test_model_sees_scaled_features() {
        let scaler = StandardScaler::new([2.0; NUM_FEATURES], [5.0; NUM_FEATURES]);
        let store = ArtifactStore::builder()
            .scaler(scaler)
            .model(EchoFirstFeature)
            .build();
        let cost = CostPredictor::new(Arc::new(store)).predict(&vector(1.0)).unwrap();
        // total_quantity 12 -> (12 - 2) / 5
        assert_eq!(cost.value, 2.0);
    }

    #[test]
    fn test_model_sees_raw_features_without_scaler() {
        let store = ArtifactStore::builder().model(EchoFirstFeature).build();
        let cost = CostPredictor::new(Arc::new(store)).predict(&vector(1.0)).unwrap();
        assert_eq!(cost.value, 12.0);
    }

    #[test]
    fn test_negative_prediction_is_clamped() {
        let store = ArtifactStore::builder().model(ConstantModel(-3.0)).build();
        let cost = CostPredictor::new(Arc::new(store)).predict(&vector(2.0)).unwrap();
        assert_eq!(cost.value, 0.0);
    }

    #[test]
    fn test_model_failure_is_internal() {
        let store = ArtifactStore::builder().model(BrokenModel).build();
        let err = CostPredictor::new(Arc::new(store)).predict(&vector(2.0)).unwrap_err();
        assert!(!err.is_client_error());
        assert!(format!("{}", err).contains("tree ensemble corrupted"));

        let store = ArtifactStore::builder().model(ConstantModel(f64::NAN)).build();
        let err = CostPredictor::new(Arc::new(store)).predict(&vector(2.0)).unwrap_err();
        assert!(matches!(err, QuoteError::Internal(_)));
    }
}
