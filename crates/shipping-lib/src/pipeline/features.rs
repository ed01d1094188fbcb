//! Feature assembly for ML inference
//!
//! Validates raw request fields, coerces them to their numeric types and
//! lays them out in the order the scaler and model were fitted with.

use crate::artifacts::ArtifactStore;
use crate::error::{QuoteError, QuoteResult};
use crate::models::{FeatureVector, OrderFields, ShippingRequest};
use serde_json::Value;
use std::sync::Arc;

/// Code used for `estado` when no encoder is loaded
pub const FALLBACK_ESTADO_CODE: f64 = 0.0;

/// Builds feature vectors from quote requests
pub struct FeatureBuilder {
    store: Arc<ArtifactStore>,
}

impl FeatureBuilder {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    /// Validate and assemble the feature vector for a request
    pub fn build(&self, request: &ShippingRequest) -> QuoteResult<FeatureVector> {
        let fields = self.validate(request)?;
        self.assemble(&fields)
    }

    /// Check required fields and coerce every field to its declared type
    pub fn validate(&self, request: &ShippingRequest) -> QuoteResult<OrderFields> {
        let num_items = request
            .num_items
            .as_ref()
            .ok_or(QuoteError::MissingField("num_items"))?;
        let estado = request
            .estado
            .as_ref()
            .ok_or(QuoteError::MissingField("estado"))?;

        let num_items = coerce_int("num_items", num_items)?;
        if num_items < 0 {
            return Err(QuoteError::type_conversion(
                "num_items",
                "a non-negative integer",
                num_items,
            ));
        }

        let estado = match estado {
            Value::String(s) if s.trim().is_empty() => return Err(QuoteError::MissingField("estado")),
            Value::String(s) => s.clone(),
            other => return Err(QuoteError::type_conversion("estado", "a string", other)),
        };

        let total_quantity = match &request.total_quantity {
            Some(v) => coerce_int("total_quantity", v)?,
            None => 0,
        };
        let subtotal = match &request.subtotal {
            Some(v) => coerce_float("subtotal", v)?,
            None => 0.0,
        };
        let total = match &request.total {
            Some(v) => coerce_float("total", v)?,
            None => 0.0,
        };

        Ok(OrderFields {
            num_items,
            estado,
            subtotal,
            total_quantity,
            total,
        })
    }

    /// Encode `estado` and lay the fields out in fitting order
    pub fn assemble(&self, fields: &OrderFields) -> QuoteResult<FeatureVector> {
        let estado_encoded = match self.store.encoder() {
            Some(encoder) => encoder
                .encode(&fields.estado)
                .ok_or_else(|| QuoteError::InvalidCategory(fields.estado.clone()))?,
            None => FALLBACK_ESTADO_CODE,
        };

        Ok(FeatureVector {
            total_quantity: fields.total_quantity as f64,
            total: fields.total,
            subtotal: fields.subtotal,
            num_items: fields.num_items as f64,
            estado_encoded,
        })
    }
}

/// Integer coercion: integers, integral strings, booleans, and floats
/// truncated toward zero
fn coerce_int(field: &'static str, value: &Value) -> QuoteResult<i64> {
    const EXPECTED: &str = "an integer";
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                let truncated = f.trunc();
                if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                    Ok(truncated as i64)
                } else {
                    Err(QuoteError::type_conversion(field, EXPECTED, n))
                }
            } else {
                Err(QuoteError::type_conversion(field, EXPECTED, n))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuoteError::type_conversion(field, EXPECTED, format!("'{}'", s))),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(QuoteError::type_conversion(field, EXPECTED, other)),
    }
}

/// Float coercion: numbers, numeric strings and booleans; non-finite
/// values are rejected
fn coerce_float(field: &'static str, value: &Value) -> QuoteResult<f64> {
    const EXPECTED: &str = "a number";
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| QuoteError::type_conversion(field, EXPECTED, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::OrdinalEncoder;
    use serde_json::json;

    fn request(body: Value) -> ShippingRequest {
        serde_json::from_value(body).unwrap()
    }

    fn without_encoder() -> FeatureBuilder {
        FeatureBuilder::new(Arc::new(ArtifactStore::builder().build()))
    }

    fn with_encoder() -> FeatureBuilder {
        let encoder = OrdinalEncoder::new(["CDMX", "JAL", "NL"]).unwrap();
        FeatureBuilder::new(Arc::new(ArtifactStore::builder().encoder(encoder).build()))
    }

    #[test]
    fn test_missing_required_fields() {
        let builder = without_encoder();
        let err = builder.build(&request(json!({"estado": "CDMX"}))).unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("num_items")));

        let err = builder.build(&request(json!({"num_items": 2}))).unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("estado")));

        let err = builder
            .build(&request(json!({"num_items": 2, "estado": "   "})))
            .unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("estado")));
    }

    #[test]
    fn test_num_items_checked_before_estado() {
        let err = without_encoder().build(&request(json!({}))).unwrap_err();
        assert!(matches!(err, QuoteError::MissingField("num_items")));
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let v = without_encoder()
            .build(&request(json!({"num_items": 2, "estado": "CDMX"})))
            .unwrap();
        assert_eq!(v.to_array(), [0.0, 0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_feature_order() {
        let v = with_encoder()
            .build(&request(json!({
                "num_items": 10,
                "subtotal": 500.0,
                "total": 550.0,
                "total_quantity": 12,
                "estado": "JAL"
            })))
            .unwrap();
        assert_eq!(v.to_array(), [12.0, 550.0, 500.0, 10.0, 1.0]);
    }

    #[test]
    fn test_lenient_coercion() {
        let fields = without_encoder()
            .validate(&request(json!({
                "num_items": "4",
                "estado": "NL",
                "subtotal": "99.5",
                "total_quantity": 7.9,
                "total": true
            })))
            .unwrap();
        assert_eq!(fields.num_items, 4);
        assert_eq!(fields.subtotal, 99.5);
        assert_eq!(fields.total_quantity, 7);
        assert_eq!(fields.total, 1.0);
    }

    #[test]
    fn test_type_conversion_failures() {
        let builder = without_encoder();
        let cases = [
            json!({"num_items": "two", "estado": "CDMX"}),
            json!({"num_items": "2.5", "estado": "CDMX"}),
            json!({"num_items": [2], "estado": "CDMX"}),
            json!({"num_items": -1, "estado": "CDMX"}),
            json!({"num_items": 2, "estado": 15}),
            json!({"num_items": 2, "estado": "CDMX", "subtotal": "abc"}),
            json!({"num_items": 2, "estado": "CDMX", "total": "inf"}),
            json!({"num_items": 2, "estado": "CDMX", "total_quantity": {"n": 1}}),
        ];
        for body in cases {
            let err = builder.build(&request(body.clone())).unwrap_err();
            assert!(
                matches!(err, QuoteError::TypeConversion { .. }),
                "expected type conversion error for {}, got {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn test_unknown_category_names_the_value() {
        let err = with_encoder()
            .build(&request(json!({"num_items": 2, "estado": "ATLANTIS"})))
            .unwrap_err();
        match err {
            QuoteError::InvalidCategory(value) => assert_eq!(value, "ATLANTIS"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_encoder_never_rejects_estado() {
        let builder = without_encoder();
        for estado in ["CDMX", "ATLANTIS", "zz", "Nuevo León"] {
            let v = builder
                .build(&request(json!({"num_items": 1, "estado": estado})))
                .unwrap();
            assert_eq!(v.estado_encoded, FALLBACK_ESTADO_CODE);
        }
    }
}
