use std::path::PathBuf;

use shared::types::Money;

use crate::pricing::PricingConfig;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Database directory |
/// | LOG_LEVEL | info | Default log filter |
/// | LOG_DIR | (unset) | Daily rolling log files, stdout when unset |
/// | LOG_JSON | false | One JSON object per log line |
/// | DELIVERY_FEE | 4000 | Fee below the free-shipping threshold (paise) |
/// | FREESHIP_MIN | 50000 | Free-shipping threshold (paise) |
/// | REFERRAL_BONUS_PERCENT | 10 | Referral bonus, whole percent |
/// | MAX_REFERRAL_BONUS | 10000 | Referral bonus cap (paise) |
/// | ORDER_EXPIRY_SECS | 900 | Unpaid online orders expire after this |
/// | EXPIRY_SWEEP_INTERVAL_SECS | 60 | How often the expiry sweep runs |
/// | MAX_WRITE_RETRIES | 3 | Retries for retryable transaction failures |
/// | PAYMENT_KEY_SECRET | (empty) | Gateway HMAC secret |
/// | CURRENCY | INR | Gateway currency |
/// | IMAGE_BASE_URL | http://localhost/images | Prefix for signed image URLs |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/orders FREESHIP_MIN=75000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,

    // === Pricing ===
    pub delivery_fee: Money,
    pub freeship_min: Money,
    pub referral_bonus_percent: u32,
    pub max_referral_bonus: Money,

    // === Lifecycle ===
    pub order_expiry_secs: u64,
    pub expiry_sweep_interval_secs: u64,
    pub max_write_retries: u32,

    // === Collaborators ===
    pub payment_key_secret: String,
    pub currency: String,
    pub image_base_url: String,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let pricing = PricingConfig::default();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            log_json: std::env::var("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            delivery_fee: std::env::var("DELIVERY_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(pricing.delivery_fee),
            freeship_min: std::env::var("FREESHIP_MIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(pricing.freeship_min),
            referral_bonus_percent: std::env::var("REFERRAL_BONUS_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(pricing.referral_bonus_percent),
            max_referral_bonus: std::env::var("MAX_REFERRAL_BONUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(pricing.max_referral_bonus),
            order_expiry_secs: std::env::var("ORDER_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            expiry_sweep_interval_secs: std::env::var("EXPIRY_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
            max_write_retries: std::env::var("MAX_WRITE_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            payment_key_secret: std::env::var("PAYMENT_KEY_SECRET").unwrap_or_default(),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "INR".into()),
            image_base_url: std::env::var("IMAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost/images".into()),
        }
    }

    /// Override the work directory (tests, tools)
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Database file inside the work directory
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    /// Subset read by the pricing and refund engines
    pub fn pricing(&self) -> PricingConfig {
        PricingConfig {
            delivery_fee: self.delivery_fee,
            freeship_min: self.freeship_min,
            referral_bonus_percent: self.referral_bonus_percent,
            max_referral_bonus: self.max_referral_bonus,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_and_pricing() {
        let config = Config::with_work_dir("/tmp/orders");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/orders/orders.redb"));
        let pricing = config.pricing();
        assert_eq!(pricing.delivery_fee, config.delivery_fee);
        assert_eq!(pricing.freeship_min, config.freeship_min);
    }
}
