//! External collaborators of the order engine
//!
//! - [`AddressBook`] - shipping address lookup
//! - [`ImageSigner`] - signed URLs for item images (display only)
//! - [`EmailSender`] - order confirmation mail, best effort
//! - [`PaymentGateway`] - online payment orders and signature checks
//!
//! All are called outside any write transaction.

pub mod address;
pub mod email;
pub mod images;
pub mod payment;

pub use address::InMemoryAddressBook;
pub use email::LogEmailSender;
pub use images::StaticImageSigner;
pub use payment::HmacPaymentGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::order::Order;
use shared::types::{Money, ShippingAddress};
use std::sync::Arc;
use thiserror::Error;

/// Collaborator failures
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Gateway-side order created before an online checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
}

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// The user's address, `None` when it does not exist or belongs to someone else
    async fn shipping_address(
        &self,
        address_id: &str,
        user_id: &str,
    ) -> Result<Option<ShippingAddress>, ServiceError>;
}

#[async_trait]
pub trait ImageSigner: Send + Sync {
    async fn signed_url(&self, key: &str) -> Option<String>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_provider_order(
        &self,
        amount: Money,
        receipt: &str,
    ) -> Result<ProviderOrder, ServiceError>;

    async fn verify_signature(
        &self,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool;
}

/// Collaborator handles held by the manager
#[derive(Clone)]
pub struct Services {
    pub addresses: Arc<dyn AddressBook>,
    pub images: Arc<dyn ImageSigner>,
    pub email: Arc<dyn EmailSender>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Bundled implementations: in-memory addresses, logged email, HMAC gateway
    pub fn local(payment_secret: &str, currency: &str, image_base_url: &str) -> Self {
        Self {
            addresses: Arc::new(InMemoryAddressBook::new()),
            images: Arc::new(StaticImageSigner::new(image_base_url)),
            email: Arc::new(LogEmailSender),
            payments: Arc::new(HmacPaymentGateway::new(payment_secret, currency)),
        }
    }
}
