//! Error taxonomy of the order engine
//!
//! - [`ErrorCode`]: numeric codes grouped by domain
//! - [`ErrorCategory`]: the domain a code belongs to
//! - [`AppError`]: code, message and structured details
//!
//! ```
//! use shared::error::{AppError, ErrorCategory, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::CouponExpired).with_detail("coupon", "SAVE10");
//! assert_eq!(err.category(), ErrorCategory::Coupon);
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
