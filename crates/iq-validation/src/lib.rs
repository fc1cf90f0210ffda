// SPDX-License-Identifier: Apache-2.0

//! Checkout input validators.
//!
//! Every predicate in this crate takes the raw string typed by the user and
//! answers with a plain `bool`. Nothing here panics, allocates global state or
//! touches I/O; malformed input simply fails validation.

pub mod brand;
pub mod card;
pub mod cpf;
pub mod email;
pub mod error;
pub mod expiry;

pub use brand::{card_brand, CardBrand};
pub use card::{luhn_valid, validate_card_number, validate_cvv};
pub use cpf::{cpf_check_digits, validate_cpf};
pub use email::validate_email;
pub use error::{ValidationError, ValidationResult};
pub use expiry::{parse_expiry, validate_expiry_date, validate_expiry_date_at, Expiry};

/// Removes every whitespace character, as typed card numbers are usually
/// grouped in blocks of four.
pub(crate) fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}
