// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Why a checkout field was rejected.
///
/// The boolean predicates never surface these; they exist for callers that
/// want to show a reason next to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field is empty")]
    Empty,

    #[error("Unexpected character '{found}'")]
    InvalidCharacter { found: char },

    #[error("Expected {expected} digits, got {actual}")]
    InvalidLength { expected: &'static str, actual: usize },

    #[error("Checksum mismatch")]
    Checksum,

    #[error("Expected format {expected}")]
    InvalidFormat { expected: &'static str },

    #[error("Month must be between 01 and 12, got {month}")]
    InvalidMonth { month: u32 },

    #[error("Card expired")]
    Expired,
}

impl ValidationError {
    pub fn invalid_length(expected: &'static str, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    pub fn invalid_format(expected: &'static str) -> Self {
        Self::InvalidFormat { expected }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
