//! Quote error taxonomy

use thiserror::Error;

/// Message returned to callers for any internal failure
pub const GENERIC_FAILURE_MESSAGE: &str = "error processing the request";

/// Errors produced while turning a request into a quote.
///
/// Degraded artifacts are not represented here: a missing scaler, encoder or
/// model is compensated inside the pipeline and never fails a request.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}, got {value}")]
    TypeConversion {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("estado '{0}' is not valid")]
    InvalidCategory(String),

    #[error("internal failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl QuoteError {
    pub fn type_conversion(
        field: &'static str,
        expected: &'static str,
        value: impl std::fmt::Display,
    ) -> Self {
        QuoteError::TypeConversion {
            field,
            expected,
            value: value.to_string(),
        }
    }

    /// True for errors caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QuoteError::Internal(_))
    }

    /// Message safe to expose to the caller
    pub fn public_message(&self) -> String {
        match self {
            QuoteError::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Stable label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            QuoteError::MissingField(_) => "missing_field",
            QuoteError::TypeConversion { .. } => "type_conversion",
            QuoteError::InvalidCategory(_) => "invalid_category",
            QuoteError::Internal(_) => "internal",
        }
    }
}

pub type QuoteResult<T> = Result<T, QuoteError>;
