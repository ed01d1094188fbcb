//! Core data models for the shipping quote service

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of values in a feature vector
pub const NUM_FEATURES: usize = 5;

/// Column names in the order the scaler and model were fitted with
pub const FEATURE_ORDER: [&str; NUM_FEATURES] = [
    "total_quantity",
    "total",
    "subtotal",
    "num_items",
    "estado_encoded",
];

/// Raw quote request as received on the wire.
///
/// Fields stay untyped until the feature builder coerces them, so a client
/// sending `"3"` for `num_items` is accepted the same way as `3`. A JSON
/// `null` is treated like an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Value>,
}

impl ShippingRequest {
    pub fn new(num_items: i64, estado: impl Into<String>) -> Self {
        let estado: String = estado.into();
        Self {
            num_items: Some(Value::from(num_items)),
            estado: Some(Value::String(estado)),
            ..Default::default()
        }
    }

    pub fn with_subtotal(mut self, subtotal: f64) -> Self {
        self.subtotal = Some(Value::from(subtotal));
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(Value::from(total));
        self
    }

    pub fn with_total_quantity(mut self, total_quantity: i64) -> Self {
        self.total_quantity = Some(Value::from(total_quantity));
        self
    }
}

/// Request fields after validation and type coercion
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFields {
    pub num_items: i64,
    pub estado: String,
    pub subtotal: f64,
    pub total_quantity: i64,
    pub total: f64,
}

/// Feature vector for ML inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub total_quantity: f64,
    pub total: f64,
    pub subtotal: f64,
    pub num_items: f64,
    pub estado_encoded: f64,
}

impl FeatureVector {
    /// Values laid out in [`FEATURE_ORDER`]
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.total_quantity,
            self.total,
            self.subtotal,
            self.num_items,
            self.estado_encoded,
        ]
    }
}

/// Where a predicted cost came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostSource {
    /// The regression model produced the value
    Model,
    /// The tiered heuristic produced the value because no model is loaded
    Fallback,
}

impl CostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostSource::Model => "model",
            CostSource::Fallback => "fallback",
        }
    }
}

/// Predicted shipping cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShippingCost {
    pub value: f64,
    pub source: CostSource,
}

/// Successful quote response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub num_items: i64,
    pub subtotal: f64,
    pub estado: String,
    pub costo_envio: f64,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
