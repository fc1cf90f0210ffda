// SPDX-License-Identifier: Apache-2.0

//! Key-value persistence backends
//!
//! The entitlement store only needs string keys mapped to string values with
//! no transactional guarantees. Writes to different keys are independent and
//! a reader may observe any prefix of a multi-key update.

pub mod file;
pub mod keychain;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;

/// Trait for the persistence medium behind the entitlement store
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory map, used by tests and ephemeral sessions.
///
/// Clones share the same underlying map, which lets a test keep a handle to
/// the data while the entitlement store owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Stands in for an environment with no key-value store at all.
/// Every operation fails with [`StoreError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::unavailable("no key-value store in this context"))
    }

    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::unavailable("no key-value store in this context"))
    }

    fn remove(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::unavailable("no key-value store in this context"))
    }
}
