// SPDX-License-Identifier: Apache-2.0

use keyring::Entry;

use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};

pub const DEFAULT_SERVICE: &str = "com.iqpass.entitlements";

/// OS credential store backend.
///
/// Each key is stored as its own credential under a single service name,
/// using the key as the account name.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> StoreResult<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| StoreError::keyring(format!("Keyring error: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(e)) => Err(StoreError::unavailable(format!(
                "Credential store not accessible: {}",
                e
            ))),
            Err(e) => Err(StoreError::keyring(format!("Failed to read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::keyring(format!("Failed to write {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::keyring(format!("Failed to delete {}: {}", key, e))),
        }
    }
}
