//! Unified error codes for the order engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment and wallet errors
//! - 6xxx: Product and stock errors
//! - 7xxx: Coupon errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::ErrorCategory;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed (raised before any transaction opens)
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order item not found
    OrderItemNotFound = 4002,
    /// Cart has no items
    CartEmpty = 4003,
    /// Requested status change is not allowed from the current status
    InvalidStatusTransition = 4004,
    /// Shipping address not found
    AddressNotFound = 4005,
    /// Concurrent modification of the same order
    WriteConflict = 4006,
    /// User not found
    UserNotFound = 4007,

    // ==================== 5xxx: Payment ====================
    /// Payment signature did not verify
    PaymentVerificationFailed = 5001,
    /// Wallet balance too low for the debit
    InsufficientBalance = 5002,
    /// Payment provider call failed
    PaymentGatewayError = 5003,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Not enough stock for the requested quantity
    InsufficientStock = 6002,

    // ==================== 7xxx: Coupon ====================
    /// Coupon does not exist or is disabled
    InvalidCoupon = 7001,
    /// Coupon is past its expiry date
    CouponExpired = 7002,
    /// Coupon global or per-user usage limit reached
    CouponLimitReached = 7003,
    /// Cart value below the coupon's minimum purchase amount
    MinPurchaseRequired = 7004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Only a lost optimistic race is retried; everything else propagates
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::WriteConflict)
    }

    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderItemNotFound => "Order item not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::InvalidStatusTransition => "Invalid status transition",
            ErrorCode::AddressNotFound => "Shipping address not found",
            ErrorCode::WriteConflict => "Order was modified concurrently, please retry",
            ErrorCode::UserNotFound => "User not found",

            // Payment
            ErrorCode::PaymentVerificationFailed => "Payment verification failed",
            ErrorCode::InsufficientBalance => "Insufficient wallet balance",
            ErrorCode::PaymentGatewayError => "Payment provider request failed",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::InsufficientStock => "Insufficient stock",

            // Coupon
            ErrorCode::InvalidCoupon => "Invalid coupon",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponLimitReached => "Coupon usage limit reached",
            ErrorCode::MinPurchaseRequired => "Minimum purchase amount not reached",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::StorageFull => "Storage full (disk space insufficient)",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderItemNotFound),
            4003 => Ok(ErrorCode::CartEmpty),
            4004 => Ok(ErrorCode::InvalidStatusTransition),
            4005 => Ok(ErrorCode::AddressNotFound),
            4006 => Ok(ErrorCode::WriteConflict),
            4007 => Ok(ErrorCode::UserNotFound),

            // Payment
            5001 => Ok(ErrorCode::PaymentVerificationFailed),
            5002 => Ok(ErrorCode::InsufficientBalance),
            5003 => Ok(ErrorCode::PaymentGatewayError),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::InsufficientStock),

            // Coupon
            7001 => Ok(ErrorCode::InvalidCoupon),
            7002 => Ok(ErrorCode::CouponExpired),
            7003 => Ok(ErrorCode::CouponLimitReached),
            7004 => Ok(ErrorCode::MinPurchaseRequired),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9401 => Ok(ErrorCode::StorageFull),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidStatusTransition.code(), 4004);
        assert_eq!(ErrorCode::WriteConflict.code(), 4006);
        assert_eq!(ErrorCode::InsufficientBalance.code(), 5002);
        assert_eq!(ErrorCode::InsufficientStock.code(), 6002);
        assert_eq!(ErrorCode::CouponLimitReached.code(), 7003);
        assert_eq!(ErrorCode::SystemBusy.code(), 9404);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(4003), Ok(ErrorCode::CartEmpty));
        assert_eq!(ErrorCode::try_from(7004), Ok(ErrorCode::MinPurchaseRequired));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::CouponExpired).unwrap();
        assert_eq!(json, "7002");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::CouponExpired);
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::WriteConflict.is_retryable());
        assert!(!ErrorCode::SystemBusy.is_retryable());
        assert!(!ErrorCode::InsufficientStock.is_retryable());
        assert!(!ErrorCode::InvalidStatusTransition.is_retryable());
    }

    #[test]
    fn test_category() {
        assert_eq!(ErrorCode::CartEmpty.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::InvalidCoupon.category(), ErrorCategory::Coupon);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }
}
