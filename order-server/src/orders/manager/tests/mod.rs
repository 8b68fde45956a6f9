use super::*;
use crate::services::{HmacPaymentGateway, InMemoryAddressBook, LogEmailSender, StaticImageSigner};
use shared::error::ErrorCode;
use shared::models::{
    Category, CategoryOffer, Coupon, DiscountType, OfferType, Product, User,
};
use shared::order::{OrderItem, PaymentStatus, TransactionReason, TransactionStatus};
use shared::types::ShippingAddress;
use std::sync::Arc;

mod test_concurrency;
mod test_refunds;

const SECRET: &str = "test-secret";
const ADDRESS_ID: &str = "home";
const CDN: &str = "https://cdn.test";

struct TestShop {
    manager: OrdersManager,
    gateway: Arc<HmacPaymentGateway>,
}

fn create_test_shop() -> TestShop {
    let storage = OrderStorage::open_in_memory().unwrap();
    let addresses = Arc::new(InMemoryAddressBook::new());
    for user_id in ["u1", "u2", "u3"] {
        addresses.insert(user_id, address());
    }
    let gateway = Arc::new(HmacPaymentGateway::new(SECRET, "INR"));
    let services = Services {
        addresses,
        images: Arc::new(StaticImageSigner::new(CDN)),
        email: Arc::new(LogEmailSender),
        payments: gateway.clone(),
    };
    let manager = OrdersManager::with_settings(storage, PricingConfig::default(), services);
    seed_catalog(manager.storage());
    TestShop { manager, gateway }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        id: ADDRESS_ID.to_string(),
        name: "Meera Iyer".to_string(),
        phone: "9000000000".to_string(),
        line1: "12 MG Road".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        pincode: "560001".to_string(),
    }
}

fn product(id: &str, list: Money) -> Product {
    Product {
        id: id.to_string(),
        title: format!("Shirt {id}"),
        slug: format!("shirt-{id}"),
        image: Some(format!("products/{id}.jpg")),
        category_id: "shirts".to_string(),
        list_price: list,
        sale_price: None,
        is_active: true,
    }
}

/// Shirts with 10% off up to ₹150, SAVE10 for 10% up to ₹100, three ₹1000 shirts
fn seed_catalog(storage: &OrderStorage) {
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
    for id in ["p1", "p2", "p3"] {
        storage.save_product(&product(id, 100_000)).unwrap();
        storage.set_stock(id, "M", 5).unwrap();
    }
    for user_id in ["u1", "u2", "u3"] {
        storage
            .save_user(&User {
                id: user_id.to_string(),
                name: format!("User {user_id}"),
                email: format!("{user_id}@example.com"),
                wallet: 0,
                referral_credits: 0,
            })
            .unwrap();
    }
}

fn fill_cart(manager: &OrdersManager, user_id: &str, products: &[&str], coupon: Option<&str>) {
    for product_id in products {
        manager.add_to_cart(user_id, product_id, "M", 1).unwrap();
    }
    if let Some(code) = coupon {
        manager.apply_coupon(user_id, code).unwrap();
    }
}

async fn place(manager: &OrdersManager, user_id: &str, method: PaymentMethod) -> AppResult<Order> {
    manager
        .place_order(PlaceOrderRequest {
            user_id: user_id.to_string(),
            address_id: ADDRESS_ID.to_string(),
            payment_method: method,
        })
        .await
}

/// Two ₹1000 shirts with SAVE10, paid from the wallet: total ₹1750
async fn place_scenario_wallet_order(manager: &OrdersManager) -> Order {
    manager.top_up_wallet("u1", 200_000).unwrap();
    fill_cart(manager, "u1", &["p1", "p2"], Some("SAVE10"));
    place(manager, "u1", PaymentMethod::Wallet).await.unwrap()
}

async fn deliver(manager: &OrdersManager, order_id: u64) -> Order {
    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        manager.update_order_status(order_id, status).await.unwrap();
    }
    manager.storage().get_order(order_id).unwrap().unwrap()
}

fn item_id_of(order: &Order, product_id: &str) -> String {
    order
        .items
        .iter()
        .find(|i| i.product_id == product_id)
        .map(|i| i.item_id.clone())
        .unwrap()
}

fn wallet_balance(manager: &OrdersManager, user_id: &str) -> Money {
    manager.storage().get_user(user_id).unwrap().unwrap().wallet
}

fn coupon_used(manager: &OrdersManager, code: &str) -> u32 {
    manager.storage().get_coupon(code).unwrap().unwrap().used_count
}

fn stock_of(manager: &OrdersManager, product_id: &str) -> u64 {
    manager.storage().stock_level(product_id, "M").unwrap()
}

/// `Σ sale·qty − special − coupon − referral + fee == total` over the priced items
fn assert_price_identity(order: &Order) {
    let items = order.priced_items();
    let sum: Money = items.iter().map(|i: &&OrderItem| i.line_total()).sum();
    let p = &order.price;
    assert_eq!(
        sum - p.special_discount - p.coupon_discount - p.referral_bonus + p.delivery_fee,
        p.total,
        "price identity broken for order {}: {:?}",
        order.order_id,
        p
    );
}
