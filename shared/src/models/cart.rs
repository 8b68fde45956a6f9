//! Cart Model

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// One (product, size, quantity) line in a cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    pub size: String,
    pub quantity: u32,
    /// Price snapshot taken when the line was added (display only)
    pub price: Money,
}

/// User-owned cart, cleared on successful checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            items: Vec::new(),
            coupon_code: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
