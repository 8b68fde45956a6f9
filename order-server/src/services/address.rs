//! In-memory address book

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::types::ShippingAddress;
use std::collections::HashMap;

use super::{AddressBook, ServiceError};

/// Addresses keyed by (user_id, address_id)
#[derive(Debug, Default)]
pub struct InMemoryAddressBook {
    entries: RwLock<HashMap<(String, String), ShippingAddress>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: &str, address: ShippingAddress) {
        self.entries
            .write()
            .insert((user_id.to_string(), address.id.clone()), address);
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn shipping_address(
        &self,
        address_id: &str,
        user_id: &str,
    ) -> Result<Option<ShippingAddress>, ServiceError> {
        Ok(self
            .entries
            .read()
            .get(&(user_id.to_string(), address_id.to_string()))
            .cloned())
    }
}
