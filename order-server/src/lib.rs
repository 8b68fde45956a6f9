//! Order Server - storefront order engine
//!
//! Prices carts, runs the order fulfillment state machine and refunds
//! cancelled or returned items while retaining stacked discounts
//! proportionally.
//!
//! # Module layout
//!
//! ```text
//! order-server/src/
//! ├── core/          # configuration, background tasks
//! ├── ledger/        # stock, wallet, counter and transaction ledgers
//! ├── orders/        # storage, actions, manager, refund engine
//! ├── pricing/       # cart pricing engine
//! ├── services/      # address book, images, email, payment gateway
//! └── utils/         # logging
//! ```

pub mod core;
pub mod ledger;
pub mod orders;
pub mod pricing;
pub mod services;
pub mod utils;

pub use crate::core::{BackgroundTasks, Config, TaskKind};
pub use orders::{ExpirySweeper, OrderFilter, OrderStorage, OrdersManager, PlaceOrderRequest};
pub use pricing::PricingConfig;
pub use services::Services;

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::init_logger;

/// Create the work and log directories, then start logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = config.log_dir.as_deref() {
        std::fs::create_dir_all(dir)?;
    }
    init_logger(&config.log_level, config.log_dir.as_deref(), config.log_json);
    Ok(())
}
