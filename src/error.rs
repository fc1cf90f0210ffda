// SPDX-License-Identifier: Apache-2.0

//! Error types for the persistence layer
//!
//! Every key-value backend maps its own failures onto [`StoreError`] so the
//! entitlement store can treat them uniformly (as "no entitlement").

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum StoreError {
    #[error("Key-value store unavailable: {message}")]
    Unavailable { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Credential store error: {message}")]
    Keyring { message: String },
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable { message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io { message: msg.into() }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization { message: msg.into() }
    }

    pub fn keyring(msg: impl Into<String>) -> Self {
        Self::Keyring { message: msg.into() }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
