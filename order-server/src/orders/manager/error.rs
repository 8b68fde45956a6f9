use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Shipping address not found: {0}")]
    AddressNotFound(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Order(e) => e.code(),
            ManagerError::Storage(e) => classify_storage_error(e),
            ManagerError::AddressNotFound(_) => ErrorCode::AddressNotFound,
            ManagerError::Gateway(_) => ErrorCode::PaymentGatewayError,
            ManagerError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// Map a storage error to a caller-facing code
pub(crate) fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::VersionConflict { .. } => return ErrorCode::WriteConflict,
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        _ => {}
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // Database/Transaction/Table/Storage/Commit errors
    ErrorCode::SystemBusy
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        let code = err.code();
        match err {
            ManagerError::Storage(e) | ManagerError::Order(OrderError::Storage(e)) => {
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::new(code)
            }
            ManagerError::Order(e) => order_error_to_app(code, e),
            ManagerError::AddressNotFound(id) => {
                AppError::new(code).with_detail("address_id", id)
            }
            ManagerError::Gateway(msg) => {
                tracing::warn!(error = %msg, "Payment gateway call failed");
                AppError::new(code)
            }
            ManagerError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                AppError::new(code)
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        ManagerError::from(err).into()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        ManagerError::from(err).into()
    }
}

fn order_error_to_app(code: ErrorCode, err: OrderError) -> AppError {
    let message = err.to_string();
    let app = AppError::with_message(code, message);
    match err {
        OrderError::OrderNotFound(id) | OrderError::PaymentVerificationFailed(id) => {
            app.with_detail("order_id", id)
        }
        OrderError::ItemNotFound(id) => app.with_detail("item_id", id),
        OrderError::ProductNotFound(id) => app.with_detail("product_id", id),
        OrderError::UserNotFound(id) => app.with_detail("user_id", id),
        OrderError::InsufficientStock {
            product_id,
            size,
            requested,
            available,
        } => app
            .with_detail("product_id", product_id)
            .with_detail("size", size)
            .with_detail("requested", requested)
            .with_detail("available", available),
        OrderError::InsufficientBalance {
            required,
            available,
        } => app
            .with_detail("required", required)
            .with_detail("available", available),
        OrderError::InvalidCoupon(c)
        | OrderError::CouponExpired(c)
        | OrderError::CouponLimitReached(c) => app.with_detail("coupon", c),
        OrderError::MinPurchaseRequired { code, required } => app
            .with_detail("coupon", code)
            .with_detail("required", required),
        OrderError::InvalidTransition { from, to } => app
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
        OrderError::CartEmpty | OrderError::Validation(_) | OrderError::Storage(_) => app,
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_is_retryable() {
        let err = ManagerError::Storage(StorageError::VersionConflict {
            order_id: 1,
            expected: 1,
            found: 2,
        });
        assert_eq!(err.code(), ErrorCode::WriteConflict);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_order_errors_keep_their_code() {
        let app: AppError = ManagerError::Order(OrderError::InsufficientStock {
            product_id: "p1".to_string(),
            size: "M".to_string(),
            requested: 3,
            available: 1,
        })
        .into();
        assert_eq!(app.code, ErrorCode::InsufficientStock);
        let details = app.details.unwrap();
        assert_eq!(details["available"], 1);
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let app: AppError = ManagerError::Storage(StorageError::Serialization(json_err)).into();
        assert_eq!(app.code, ErrorCode::InternalError);
        assert_eq!(app.message, ErrorCode::InternalError.message());
    }
}
