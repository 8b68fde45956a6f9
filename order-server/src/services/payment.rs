//! HMAC-signed payment gateway
//!
//! Provider order ids are generated locally. A capture is genuine when its
//! signature is `hex(HMAC-SHA256(secret, "{provider_order_id}|{payment_id}"))`.

use async_trait::async_trait;
use ring::hmac;
use shared::types::Money;

use super::{PaymentGateway, ProviderOrder, ServiceError};

pub struct HmacPaymentGateway {
    key: hmac::Key,
    currency: String,
}

impl std::fmt::Debug for HmacPaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacPaymentGateway")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl HmacPaymentGateway {
    pub fn new(secret: &str, currency: impl Into<String>) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            currency: currency.into(),
        }
    }

    /// Signature the provider would send back for a capture
    pub fn sign(&self, provider_order_id: &str, payment_id: &str) -> String {
        let message = format!("{provider_order_id}|{payment_id}");
        hex::encode(hmac::sign(&self.key, message.as_bytes()).as_ref())
    }
}

#[async_trait]
impl PaymentGateway for HmacPaymentGateway {
    async fn create_provider_order(
        &self,
        amount: Money,
        receipt: &str,
    ) -> Result<ProviderOrder, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::Request(format!(
                "amount must be positive, got {amount}"
            )));
        }
        let id = format!("order_{}", uuid::Uuid::new_v4().simple());
        tracing::debug!(provider_order_id = %id, amount, receipt = %receipt, "Provider order created");
        Ok(ProviderOrder {
            id,
            amount,
            currency: self.currency.clone(),
        })
    }

    async fn verify_signature(
        &self,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let Ok(tag) = hex::decode(signature) else {
            return false;
        };
        let message = format!("{provider_order_id}|{payment_id}");
        hmac::verify(&self.key, message.as_bytes(), &tag).is_ok()
    }
}
