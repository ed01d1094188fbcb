//! Quote pipeline: request fields -> feature vector -> shipping cost

mod features;
mod predictor;

pub use features::{FeatureBuilder, FALLBACK_ESTADO_CODE};
pub use predictor::{
    CostPredictor, FallbackTiers, LARGE_ORDER_COST, MEDIUM_ORDER_COST, MEDIUM_ORDER_MAX_ITEMS,
    SMALL_ORDER_COST, SMALL_ORDER_MAX_ITEMS,
};

use crate::artifacts::ArtifactStore;
use crate::error::QuoteResult;
use crate::models::{OrderFields, ShippingCost, ShippingQuote, ShippingRequest};
use std::sync::Arc;

/// Validated order together with its predicted cost
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub fields: OrderFields,
    pub cost: ShippingCost,
}

impl PricedOrder {
    pub fn response(&self) -> ShippingQuote {
        ShippingQuote {
            num_items: self.fields.num_items,
            subtotal: self.fields.subtotal,
            estado: self.fields.estado.clone(),
            costo_envio: self.cost.value,
        }
    }
}

/// Full inference pipeline over a shared, immutable artifact store
pub struct QuotePipeline {
    store: Arc<ArtifactStore>,
    features: FeatureBuilder,
    predictor: CostPredictor,
}

impl QuotePipeline {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            features: FeatureBuilder::new(store.clone()),
            predictor: CostPredictor::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn quote(&self, request: &ShippingRequest) -> QuoteResult<PricedOrder> {
        let fields = self.features.validate(request)?;
        let vector = self.features.assemble(&fields)?;
        let cost = self.predictor.predict(&vector)?;
        Ok(PricedOrder { fields, cost })
    }
}
