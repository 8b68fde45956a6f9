//! Discount Evaluators
//!
//! Category offer, coupon and referral bonus, each evaluated against a
//! frozen rule snapshot. The same raw amount functions serve checkout and
//! refund recomputation; only the minimum-purchase gates differ, and those
//! live with the caller.

use std::collections::BTreeMap;

use shared::models::{CategoryOffer, Coupon, DiscountType, OfferType};
use shared::order::{AppliedCategoryOffer, AppliedCoupon, AppliedReferral};
use shared::types::{Money, Timestamp};

use super::PricingConfig;
use crate::orders::money::{capped, percent_of};
use crate::orders::traits::OrderError;

// ==================== Snapshots ====================

pub fn freeze_offer(category_id: &str, offer: &CategoryOffer) -> AppliedCategoryOffer {
    AppliedCategoryOffer {
        category_id: category_id.to_string(),
        offer_type: offer.offer_type,
        discount: offer.discount,
        min_purchase_amount: offer.min_purchase_amount,
        max_redeemable: offer.max_redeemable,
    }
}

pub fn freeze_coupon(coupon: &Coupon) -> AppliedCoupon {
    AppliedCoupon {
        code: coupon.code.clone(),
        discount_type: coupon.discount_type,
        discount_value: coupon.discount_value,
        min_purchase_amount: coupon.min_purchase_amount,
        max_discount_amount: coupon.max_discount_amount,
    }
}

pub fn freeze_referral(config: &PricingConfig) -> AppliedReferral {
    AppliedReferral {
        percent: config.referral_bonus_percent,
        max_bonus: config.max_referral_bonus,
    }
}

// ==================== Category Offer ====================

/// Sale totals grouped by category, ordered by category id
pub fn category_totals<'a>(
    lines: impl IntoIterator<Item = (&'a str, Money)>,
) -> BTreeMap<String, Money> {
    let mut totals = BTreeMap::new();
    for (category_id, amount) in lines {
        *totals.entry(category_id.to_string()).or_insert(0) += amount;
    }
    totals
}

/// Offer amount over a category total, ignoring the minimum purchase
pub fn offer_amount(offer: &AppliedCategoryOffer, category_total: Money) -> Money {
    if category_total <= 0 {
        return 0;
    }
    let amount = match offer.offer_type {
        OfferType::Flat => offer.discount.max(0),
        OfferType::Percent => capped(
            percent_of(category_total, offer.discount),
            offer.max_redeemable,
        ),
    };
    amount.min(category_total)
}

/// Checkout evaluation: both offer types need the minimum purchase
pub fn category_offer_discount(offer: &AppliedCategoryOffer, category_total: Money) -> Money {
    if category_total < offer.min_purchase_amount {
        return 0;
    }
    offer_amount(offer, category_total)
}

/// Pick the single offer worth the most
///
/// Categories are visited in ascending id order and only a strictly larger
/// amount replaces the current pick, so equal amounts resolve to the lowest
/// category id. Offers worth nothing are never picked.
pub fn best_category_offer(
    totals: &BTreeMap<String, Money>,
    offers: &BTreeMap<String, AppliedCategoryOffer>,
) -> Option<(AppliedCategoryOffer, Money)> {
    let mut best: Option<(AppliedCategoryOffer, Money)> = None;
    for (category_id, total) in totals {
        let Some(offer) = offers.get(category_id) else {
            continue;
        };
        let amount = category_offer_discount(offer, *total);
        if amount <= 0 {
            continue;
        }
        match &best {
            Some((_, current)) if amount <= *current => {}
            _ => best = Some((offer.clone(), amount)),
        }
    }
    best
}

// ==================== Coupon ====================

/// Checkout-time eligibility of a coupon
///
/// `user_uses` is how many of the user's live orders already carry the code.
pub fn check_coupon(
    coupon: &Coupon,
    base: Money,
    now: Timestamp,
    user_uses: u32,
) -> Result<(), OrderError> {
    if !coupon.is_active {
        return Err(OrderError::InvalidCoupon(coupon.code.clone()));
    }
    if now > coupon.expires_at {
        return Err(OrderError::CouponExpired(coupon.code.clone()));
    }
    if base < coupon.min_purchase_amount {
        return Err(OrderError::MinPurchaseRequired {
            code: coupon.code.clone(),
            required: coupon.min_purchase_amount,
        });
    }
    if coupon.used_count >= coupon.usage_limit || user_uses >= coupon.per_user_limit {
        return Err(OrderError::CouponLimitReached(coupon.code.clone()));
    }
    Ok(())
}

/// Coupon amount over `base`, ignoring the minimum purchase
pub fn coupon_amount(coupon: &AppliedCoupon, base: Money) -> Money {
    if base <= 0 {
        return 0;
    }
    let amount = match coupon.discount_type {
        DiscountType::Fixed => coupon.discount_value.max(0),
        DiscountType::Percentage => capped(
            percent_of(base, coupon.discount_value),
            coupon.max_discount_amount,
        ),
    };
    amount.min(base)
}

// ==================== Referral & Delivery ====================

/// Referral bonus over what is left after category offer and coupon
pub fn referral_bonus(rule: &AppliedReferral, remaining: Money) -> Money {
    percent_of(remaining, i64::from(rule.percent))
        .min(rule.max_bonus)
        .min(remaining.max(0))
}

/// Flat fee, charged only when `0 < remaining < freeship_min`
pub fn delivery_fee(config: &PricingConfig, remaining: Money) -> Money {
    if remaining > 0 && remaining < config.freeship_min {
        config.delivery_fee
    } else {
        0
    }
}
