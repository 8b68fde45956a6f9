//! Proportional refund math
//!
//! When some items leave an order while others stay, each stacked discount
//! is re-derived from the remaining items using the rule snapshots frozen on
//! the order. The customer gets back the removed items' sale value minus
//! whatever discount the order no longer earns:
//!
//! ```text
//! refund = Σ removed sale * qty
//!        - (category_before - category_after)
//!        - (coupon_before   - coupon_after)
//!        - (referral_before - referral_after)
//! ```
//!
//! Every recomputed discount is clamped to its previous value, so removing
//! items can never grow a discount. The delivery fee is re-evaluated against
//! the new total and is not part of the refund.

use shared::models::{DiscountType, OfferType};
use shared::order::{OrderItem, OrderPrice};
use shared::types::Money;

use crate::pricing::{PricingConfig, coupon_amount, delivery_fee, offer_amount, referral_bonus};

/// Outcome of a partial removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputed {
    /// Price of the remaining items, snapshots unchanged
    pub price: OrderPrice,
    /// Amount owed back, before any cap on what was actually paid
    pub refund: Money,
    pub category_delta: Money,
    pub coupon_delta: Money,
    pub referral_delta: Money,
}

/// Re-price `remaining` after `removed` left an order priced at `current`
pub fn recompute_after_removal(
    current: &OrderPrice,
    remaining: &[&OrderItem],
    removed: &[&OrderItem],
    config: &PricingConfig,
) -> Recomputed {
    let subtotal: Money = remaining.iter().map(|i| i.line_list_total()).sum();
    let discounted: Money = remaining.iter().map(|i| i.line_total()).sum();
    let removed_value: Money = removed.iter().map(|i| i.line_total()).sum();

    // Category offer, over what is left of its own category
    let special_discount = match &current.applied_category_offer {
        Some(offer) => {
            let category_total: Money = remaining
                .iter()
                .filter(|i| i.category_id == offer.category_id)
                .map(|i| i.line_total())
                .sum();
            let amount = match offer.offer_type {
                OfferType::Flat if category_total < offer.min_purchase_amount => 0,
                _ => offer_amount(offer, category_total),
            };
            amount.min(current.special_discount)
        }
        None => 0,
    };

    // Coupon, over the remaining discounted total
    let coupon_base = discounted - special_discount;
    let coupon_discount = match &current.applied_coupon {
        Some(coupon) => {
            let amount = match coupon.discount_type {
                DiscountType::Fixed if coupon_base < coupon.min_purchase_amount => 0,
                _ => coupon_amount(coupon, coupon_base),
            };
            amount.min(current.coupon_discount)
        }
        None => 0,
    };

    // Referral, only if the order earned one
    let after_coupon = coupon_base - coupon_discount;
    let referral = match &current.applied_referral {
        Some(rule) if current.referral_bonus > 0 => {
            referral_bonus(rule, after_coupon).min(current.referral_bonus)
        }
        _ => 0,
    };

    let remaining_total = after_coupon - referral;
    let fee = delivery_fee(config, remaining_total);

    let category_delta = current.special_discount - special_discount;
    let coupon_delta = current.coupon_discount - coupon_discount;
    let referral_delta = current.referral_bonus - referral;
    let refund = (removed_value - category_delta - coupon_delta - referral_delta).max(0);

    let price = OrderPrice {
        subtotal,
        discount: (subtotal - discounted) + special_discount,
        special_discount,
        applied_category_offer: current.applied_category_offer.clone(),
        coupon_discount,
        applied_coupon: current.applied_coupon.clone(),
        referral_bonus: referral,
        applied_referral: current.applied_referral.clone(),
        delivery_fee: fee,
        total: remaining_total + fee,
    };

    Recomputed {
        price,
        refund,
        category_delta,
        coupon_delta,
        referral_delta,
    }
}
