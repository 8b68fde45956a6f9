//! Order aggregate types

use serde::{Deserialize, Serialize};

use super::status::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::models::{DiscountType, OfferType};
use crate::types::{Money, ShippingAddress, Timestamp};

// ============================================================================
// Frozen rule snapshots
// ============================================================================

/// Category offer as it was when the order was priced
///
/// Refund recomputation reads this, never the live category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedCategoryOffer {
    pub category_id: String,
    pub offer_type: OfferType,
    pub discount: i64,
    pub min_purchase_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redeemable: Option<Money>,
}

/// Coupon rule as it was when the order was priced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_purchase_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Money>,
}

/// Referral-bonus rule as it was when the order was priced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedReferral {
    pub percent: u32,
    pub max_bonus: Money,
}

// ============================================================================
// Price
// ============================================================================

/// Price breakdown of an order
///
/// Identity kept at every lifecycle point, over the priced items:
/// `sum(sale_price * qty) - special_discount - coupon_discount - referral_bonus + delivery_fee == total`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderPrice {
    /// Sum of list price * quantity
    pub subtotal: Money,
    /// Markdown savings (list - sale) plus the category offer
    pub discount: Money,
    /// Category offer amount
    pub special_discount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_category_offer: Option<AppliedCategoryOffer>,
    pub coupon_discount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<AppliedCoupon>,
    pub referral_bonus: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_referral: Option<AppliedReferral>,
    pub delivery_fee: Money,
    pub total: Money,
}

// ============================================================================
// Items
// ============================================================================

/// Per-item lifecycle timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemTimeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_requested_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reviewed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<Timestamp>,
}

/// Order line with a frozen product snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub item_id: String,
    pub product_id: String,
    pub size: String,
    pub quantity: u32,
    pub title: String,
    pub slug: String,
    /// Image key at rest; replaced with a signed URL before leaving the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category_id: String,
    pub list_price: Money,
    pub sale_price: Money,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
    #[serde(default)]
    pub timeline: ItemTimeline,
}

impl OrderItem {
    /// Sale price * quantity
    pub fn line_total(&self) -> Money {
        self.sale_price * Money::from(self.quantity)
    }

    /// List price * quantity
    pub fn line_list_total(&self) -> Money {
        self.list_price * Money::from(self.quantity)
    }
}

// ============================================================================
// Order
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway order reference (online payments)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_order_id: Option<String>,
    /// Gateway payment reference, set on capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_id: Option<String>,
    /// Amount actually collected: at checkout for prepaid orders, on delivery for COD
    #[serde(default)]
    pub paid_amount: Money,
    /// Total credited back to the customer so far
    #[serde(default)]
    pub refunded_amount: Money,
}

impl Payment {
    /// What can still be credited back
    pub fn refundable(&self) -> Money {
        (self.paid_amount - self.refunded_amount).max(0)
    }
}

/// Order lifecycle timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderTimeline {
    pub placed_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_requested_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reviewed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<Timestamp>,
}

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    /// Sequential id, assigned once at checkout
    pub order_id: u64,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment: Payment,
    pub price: OrderPrice,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    /// Append-only; the first entry holds the original priced snapshot
    pub transaction_ids: Vec<String>,
    pub timeline: OrderTimeline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
    /// Bumped on every persisted change
    #[serde(default)]
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn item_index(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.item_id == item_id)
    }

    /// Items still carried by the order price
    pub fn active_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|i| !i.status.is_terminal())
    }

    pub fn active_item_count(&self) -> usize {
        self.active_items().count()
    }

    /// Items the current `price` describes: the active ones, or all of them
    /// once the price has been reset to the original snapshot
    pub fn priced_items(&self) -> Vec<&OrderItem> {
        if self.active_item_count() == 0 {
            self.items.iter().collect()
        } else {
            self.active_items().collect()
        }
    }

    pub fn first_transaction_id(&self) -> Option<&str> {
        self.transaction_ids.first().map(String::as_str)
    }

    pub fn latest_transaction_id(&self) -> Option<&str> {
        self.transaction_ids.last().map(String::as_str)
    }

    pub fn is_paid(&self) -> bool {
        self.payment.status == PaymentStatus::Paid
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.price.applied_coupon.as_ref().map(|c| c.code.as_str())
    }
}
