//! Product Model

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Product entity
///
/// Stock is not stored here: it lives per (product, size) in the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Blob-storage key of the primary image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category reference
    pub category_id: String,
    /// Price before markdown
    pub list_price: Money,
    /// Markdown price, if the product is on sale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Money>,
    pub is_active: bool,
}

impl Product {
    /// Price a customer actually pays per unit before order-level discounts
    pub fn effective_price(&self) -> Money {
        self.sale_price.unwrap_or(self.list_price)
    }
}
