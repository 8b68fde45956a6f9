//! The error every public engine operation returns

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Taxonomy code, message and structured context of a failed operation
///
/// Serializes to `{"code": 6101, "message": "...", "details": {...}}` so a
/// transport layer can return it unchanged.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Error carrying the code's stock message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Rejected input, raised before any transaction opens
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, message)
    }

    /// Attach one `key: value` of context (offending product, amounts, ...)
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code.code())
    }

    /// Whether the same request may simply be sent again
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_stock_message() {
        let err = AppError::new(ErrorCode::CartEmpty);
        assert_eq!(err.message, "Cart is empty");
        assert_eq!(err.category(), ErrorCategory::Order);
        assert!(err.details.is_none());
    }

    #[test]
    fn test_details_and_wire_shape() {
        let err = AppError::new(ErrorCode::InsufficientStock)
            .with_detail("product_id", "p-1")
            .with_detail("available", 2);
        assert_eq!(err.detail("available"), Some(&Value::from(2)));
        assert_eq!(err.category(), ErrorCategory::Product);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], Value::from(ErrorCode::InsufficientStock.code()));
        assert_eq!(json["details"]["product_id"], "p-1");
        assert!(serde_json::to_value(AppError::validation("x")).unwrap().get("details").is_none());
    }
}
