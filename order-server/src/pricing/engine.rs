//! Cart Pricing Engine
//!
//! Validates a cart against the catalog and live stock, then stacks the
//! discounts in a fixed order:
//!
//! ```text
//! subtotal (list)          Σ list_price * qty
//! discounted               Σ sale_price * qty
//!   - category offer       best single offer among touched categories
//!   - coupon               on (discounted - category offer)
//!   - referral bonus       on what is left, when the user holds a credit
//!   + delivery fee         when 0 < remaining < freeship_min
//! = total
//! ```
//!
//! Pricing has no side effects. Counters and stock are only touched by the
//! checkout action that consumes the [`Quote`].

use std::collections::BTreeMap;

use shared::models::{Cart, Product, User};
use shared::order::{OrderItem, OrderPrice, OrderStatus};
use shared::types::{Money, Timestamp};

use super::PricingConfig;
use super::evaluators::{
    best_category_offer, category_totals, check_coupon, coupon_amount, delivery_fee,
    freeze_coupon, freeze_offer, freeze_referral, referral_bonus,
};
use crate::orders::money::line_total;
use crate::orders::storage::StoreRead;
use crate::orders::traits::OrderError;

/// One validated cart line with its live product
#[derive(Debug, Clone)]
pub struct QuotedLine {
    pub product: Product,
    pub size: String,
    pub quantity: u32,
}

impl QuotedLine {
    pub fn list_total(&self) -> Money {
        line_total(self.product.list_price, self.quantity)
    }

    pub fn sale_total(&self) -> Money {
        line_total(self.product.effective_price(), self.quantity)
    }
}

/// Result of pricing a cart
#[derive(Debug, Clone)]
pub struct Quote {
    pub price: OrderPrice,
    pub lines: Vec<QuotedLine>,
}

impl Quote {
    /// Referral credit this quote would consume
    pub fn uses_referral(&self) -> bool {
        self.price.referral_bonus > 0
    }

    /// Order lines with the product data frozen as of now
    pub fn freeze_items(&self, status: OrderStatus) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|line| OrderItem {
                item_id: shared::util::new_id(),
                product_id: line.product.id.clone(),
                size: line.size.clone(),
                quantity: line.quantity,
                title: line.product.title.clone(),
                slug: line.product.slug.clone(),
                image: line.product.image.clone(),
                category_id: line.product.category_id.clone(),
                list_price: line.product.list_price,
                sale_price: line.product.effective_price(),
                status,
                cancel_reason: None,
                return_reason: None,
                timeline: Default::default(),
            })
            .collect()
    }
}

/// Price a cart for its owner
///
/// Stock is checked per (product, size) across all lines that share it.
/// Fails with `CartEmpty`, `ProductNotFound`, `InsufficientStock` or one of
/// the coupon errors.
pub fn price_cart(
    store: &impl StoreRead,
    cart: &Cart,
    user: &User,
    config: &PricingConfig,
    now: Timestamp,
) -> Result<Quote, OrderError> {
    if cart.is_empty() {
        return Err(OrderError::CartEmpty);
    }

    // ========== Lines & stock ==========
    let mut lines = Vec::with_capacity(cart.items.len());
    let mut demand: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for item in &cart.items {
        if item.quantity == 0 {
            return Err(OrderError::Validation(format!(
                "quantity for {} ({}) must be at least 1",
                item.product_id, item.size
            )));
        }
        let product = store
            .product(&item.product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| OrderError::ProductNotFound(item.product_id.clone()))?;
        *demand
            .entry((item.product_id.as_str(), item.size.as_str()))
            .or_insert(0) += u64::from(item.quantity);
        lines.push(QuotedLine {
            product,
            size: item.size.clone(),
            quantity: item.quantity,
        });
    }
    for ((product_id, size), requested) in demand {
        let available = store.read_stock(product_id, size)?.unwrap_or(0);
        if available < requested {
            return Err(OrderError::InsufficientStock {
                product_id: product_id.to_string(),
                size: size.to_string(),
                requested: u32::try_from(requested).unwrap_or(u32::MAX),
                available,
            });
        }
    }

    let subtotal: Money = lines.iter().map(QuotedLine::list_total).sum();
    let discounted: Money = lines.iter().map(QuotedLine::sale_total).sum();

    // ========== Category offer ==========
    let totals = category_totals(
        lines
            .iter()
            .map(|l| (l.product.category_id.as_str(), l.sale_total())),
    );
    let mut offers = BTreeMap::new();
    for category_id in totals.keys() {
        if let Some(category) = store.category(category_id)?
            && let Some(offer) = category.offer.as_ref().filter(|o| o.is_active)
        {
            offers.insert(category_id.clone(), freeze_offer(category_id, offer));
        }
    }
    let (applied_category_offer, special_discount) = match best_category_offer(&totals, &offers) {
        Some((offer, amount)) => (Some(offer), amount),
        None => (None, 0),
    };

    // ========== Coupon ==========
    let coupon_base = discounted - special_discount;
    let (applied_coupon, coupon_discount) = match cart.coupon_code.as_deref() {
        Some(code) => {
            let coupon = store
                .coupon(code)?
                .ok_or_else(|| OrderError::InvalidCoupon(code.to_string()))?;
            let user_uses = live_coupon_uses(store, &user.id, &coupon.code)?;
            check_coupon(&coupon, coupon_base, now, user_uses)?;
            let applied = freeze_coupon(&coupon);
            let amount = coupon_amount(&applied, coupon_base);
            (Some(applied), amount)
        }
        None => (None, 0),
    };

    // ========== Referral & delivery ==========
    let mut remaining = coupon_base - coupon_discount;
    let (applied_referral, referral) = if user.referral_credits > 0 {
        let rule = freeze_referral(config);
        let amount = referral_bonus(&rule, remaining);
        if amount > 0 {
            (Some(rule), amount)
        } else {
            (None, 0)
        }
    } else {
        (None, 0)
    };
    remaining -= referral;
    let fee = delivery_fee(config, remaining);

    let price = OrderPrice {
        subtotal,
        discount: (subtotal - discounted) + special_discount,
        special_discount,
        applied_category_offer,
        coupon_discount,
        applied_coupon,
        referral_bonus: referral,
        applied_referral,
        delivery_fee: fee,
        total: remaining + fee,
    };
    Ok(Quote { price, lines })
}

/// How many of the user's orders carry `code` and were not cancelled
fn live_coupon_uses(store: &impl StoreRead, user_id: &str, code: &str) -> Result<u32, OrderError> {
    let count = store
        .user_orders(user_id)?
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled && o.coupon_code() == Some(code))
        .count();
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use shared::models::{CartItem, Category, CategoryOffer, Coupon, DiscountType, OfferType};

    fn product(id: &str, category_id: &str, list: Money, sale: Option<Money>) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {id}"),
            slug: id.to_string(),
            image: Some(format!("images/{id}.jpg")),
            category_id: category_id.to_string(),
            list_price: list,
            sale_price: sale,
            is_active: true,
        }
    }

    fn user(referral_credits: u32) -> User {
        User {
            id: "u1".to_string(),
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            wallet: 0,
            referral_credits,
        }
    }

    fn cart(lines: &[(&str, u32)], coupon: Option<&str>) -> Cart {
        Cart {
            user_id: "u1".to_string(),
            items: lines
                .iter()
                .map(|(id, qty)| CartItem {
                    product_id: id.to_string(),
                    size: "M".to_string(),
                    quantity: *qty,
                    price: 0,
                })
                .collect(),
            coupon_code: coupon.map(str::to_string),
        }
    }

    fn seed_scenario(storage: &OrderStorage) {
        storage
            .save_category(&Category {
                id: "shirts".to_string(),
                name: "Shirts".to_string(),
                offer: Some(CategoryOffer {
                    offer_type: OfferType::Percent,
                    discount: 10,
                    min_purchase_amount: 0,
                    max_redeemable: Some(15_000),
                    is_active: true,
                }),
            })
            .unwrap();
        storage
            .save_coupon(&Coupon {
                code: "SAVE10".to_string(),
                discount_type: DiscountType::Percentage,
                discount_value: 10,
                min_purchase_amount: 0,
                max_discount_amount: Some(10_000),
                usage_limit: 100,
                used_count: 0,
                per_user_limit: 1,
                expires_at: i64::MAX,
                is_active: true,
            })
            .unwrap();
        for id in ["p1", "p2"] {
            storage
                .save_product(&product(id, "shirts", 100_000, None))
                .unwrap();
            storage.set_stock(id, "M", 5).unwrap();
        }
    }

    #[test]
    fn test_two_items_category_and_coupon_stack() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_scenario(&storage);
        let read = storage.begin_read().unwrap();

        let quote = price_cart(
            &read,
            &cart(&[("p1", 1), ("p2", 1)], Some("SAVE10")),
            &user(0),
            &PricingConfig::default(),
            1,
        )
        .unwrap();

        let price = &quote.price;
        assert_eq!(price.subtotal, 200_000);
        assert_eq!(price.special_discount, 15_000);
        assert_eq!(price.discount, 15_000);
        assert_eq!(price.coupon_discount, 10_000);
        assert_eq!(price.delivery_fee, 0);
        assert_eq!(price.total, 175_000);
        assert_eq!(price.applied_coupon.as_ref().unwrap().code, "SAVE10");
        assert!(!quote.uses_referral());
    }

    #[test]
    fn test_markdown_and_referral_with_delivery_fee() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage
            .save_product(&product("p9", "socks", 30_000, Some(20_000)))
            .unwrap();
        storage.set_stock("p9", "M", 3).unwrap();
        let read = storage.begin_read().unwrap();

        let quote = price_cart(
            &read,
            &cart(&[("p9", 2)], None),
            &user(1),
            &PricingConfig::default(),
            1,
        )
        .unwrap();

        let price = &quote.price;
        assert_eq!(price.subtotal, 60_000);
        assert_eq!(price.discount, 20_000);
        assert_eq!(price.special_discount, 0);
        assert_eq!(price.referral_bonus, 4_000);
        assert_eq!(price.delivery_fee, 4_000);
        assert_eq!(price.total, 40_000);
        assert!(quote.uses_referral());

        let sale_total: Money = quote.lines.iter().map(QuotedLine::sale_total).sum();
        assert_eq!(
            sale_total - price.special_discount - price.coupon_discount - price.referral_bonus
                + price.delivery_fee,
            price.total
        );
    }

    #[test]
    fn test_stock_checked_across_lines_of_same_size() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_scenario(&storage);
        let read = storage.begin_read().unwrap();

        let err = price_cart(
            &read,
            &cart(&[("p1", 3), ("p1", 3)], None),
            &user(0),
            &PricingConfig::default(),
            1,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_cart_errors() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_scenario(&storage);
        let read = storage.begin_read().unwrap();
        let config = PricingConfig::default();

        assert!(matches!(
            price_cart(&read, &Cart::new("u1"), &user(0), &config, 1),
            Err(OrderError::CartEmpty)
        ));
        assert!(matches!(
            price_cart(&read, &cart(&[("nope", 1)], None), &user(0), &config, 1),
            Err(OrderError::ProductNotFound(_))
        ));
        assert!(matches!(
            price_cart(&read, &cart(&[("p1", 1)], Some("BOGUS")), &user(0), &config, 1),
            Err(OrderError::InvalidCoupon(_))
        ));
        assert!(matches!(
            price_cart(&read, &cart(&[("p1", 0)], None), &user(0), &config, 1),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_frozen_items_copy_product_data() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_scenario(&storage);
        let read = storage.begin_read().unwrap();

        let quote = price_cart(
            &read,
            &cart(&[("p1", 2)], None),
            &user(0),
            &PricingConfig::default(),
            1,
        )
        .unwrap();
        let items = quote.freeze_items(OrderStatus::Pending);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sale_price, 100_000);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].category_id, "shirts");
        assert_eq!(items[0].image.as_deref(), Some("images/p1.jpg"));
    }
}
