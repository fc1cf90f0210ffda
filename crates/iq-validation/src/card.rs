// SPDX-License-Identifier: Apache-2.0

//! Card number and CVV checks.

use crate::error::{ValidationError, ValidationResult};
use crate::strip_whitespace;

const MIN_CARD_LENGTH: usize = 13;
const MAX_CARD_LENGTH: usize = 19;

/// Returns true if `input` is a 13 to 19 digit card number passing the Luhn check.
///
/// Whitespace anywhere in the input is ignored. Any other non-digit character
/// fails the check outright.
pub fn validate_card_number(input: &str) -> bool {
    check_card_number(input).is_ok()
}

/// Same as [`validate_card_number`] but reports why the number was rejected.
/// On success returns the digits with whitespace removed.
pub fn check_card_number(input: &str) -> ValidationResult<String> {
    let cleaned = strip_whitespace(input);
    if cleaned.is_empty() {
        return Err(ValidationError::Empty);
    }
    if let Some(found) = cleaned.chars().find(|c| !c.is_ascii_digit()) {
        return Err(ValidationError::InvalidCharacter { found });
    }
    if !(MIN_CARD_LENGTH..=MAX_CARD_LENGTH).contains(&cleaned.len()) {
        return Err(ValidationError::invalid_length("13-19", cleaned.len()));
    }
    if !luhn_valid(&cleaned) {
        return Err(ValidationError::Checksum);
    }
    Ok(cleaned)
}

/// Luhn checksum over a string of ASCII digits.
///
/// Scanning from the rightmost digit, every second digit is doubled (minus 9
/// when the result exceeds 9) and everything is summed. Returns false for an
/// empty string or on any non-digit.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (position, byte) in digits.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if position % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

/// Returns true if `input` is exactly 3 or 4 ASCII digits.
pub fn validate_cvv(input: &str) -> bool {
    check_cvv(input).is_ok()
}

pub fn check_cvv(input: &str) -> ValidationResult<()> {
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }
    if let Some(found) = input.chars().find(|c| !c.is_ascii_digit()) {
        return Err(ValidationError::InvalidCharacter { found });
    }
    match input.len() {
        3 | 4 => Ok(()),
        other => Err(ValidationError::invalid_length("3-4", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Appends the digit that makes `body` pass the Luhn check.
    fn with_check_digit(body: &str) -> String {
        (0..=9)
            .map(|d| format!("{body}{d}"))
            .find(|candidate| luhn_valid(candidate))
            .unwrap()
    }

    #[test]
    fn known_card_numbers() {
        assert!(validate_card_number("4532015112830366"));
        assert!(validate_card_number("4111111111111111"));
        assert!(validate_card_number("5555555555554444"));
        assert!(validate_card_number("378282246310005"));
        assert!(!validate_card_number("1234567890123"));
        assert!(!validate_card_number("4000000000000000"));
    }

    #[test]
    fn whitespace_is_ignored() {
        assert!(validate_card_number("4532 0151 1283 0366"));
        assert!(validate_card_number(" 4532\t015112830366 "));
    }

    #[test]
    fn non_digits_fail_fast() {
        assert_eq!(
            check_card_number("4532-0151-1283-0366"),
            Err(ValidationError::InvalidCharacter { found: '-' })
        );
        assert!(!validate_card_number("453201511283036a"));
        assert!(!validate_card_number("４５３２015112830366"));
    }

    #[test]
    fn empty_and_short_numbers_rejected() {
        assert_eq!(check_card_number(""), Err(ValidationError::Empty));
        assert_eq!(check_card_number("   "), Err(ValidationError::Empty));
        // 79927398713 passes Luhn but is only 11 digits long
        assert!(luhn_valid("79927398713"));
        assert_eq!(
            check_card_number("79927398713"),
            Err(ValidationError::invalid_length("13-19", 11))
        );
    }

    #[test]
    fn twenty_digits_rejected_even_with_valid_checksum() {
        let number = with_check_digit("4000000000000000000");
        assert_eq!(number.len(), 20);
        assert!(luhn_valid(&number));
        assert!(!validate_card_number(&number));
    }

    #[test]
    fn cvv_lengths() {
        assert!(validate_cvv("123"));
        assert!(validate_cvv("1234"));
        assert!(!validate_cvv("12"));
        assert!(!validate_cvv("12345"));
        assert!(!validate_cvv("12a"));
        assert!(!validate_cvv(" 123"));
        assert!(!validate_cvv(""));
    }

    proptest! {
        #[test]
        fn luhn_completed_numbers_are_accepted(body in "[0-9]{12,18}") {
            let number = with_check_digit(&body);
            prop_assert!(validate_card_number(&number));
        }

        #[test]
        fn single_digit_substitution_is_rejected(
            body in "[0-9]{12,18}",
            position in any::<prop::sample::Index>(),
            delta in 1u8..=9,
        ) {
            let number = with_check_digit(&body);
            let mut bytes = number.into_bytes();
            let at = position.index(bytes.len());
            bytes[at] = b'0' + (bytes[at] - b'0' + delta) % 10;
            let mutated = String::from_utf8(bytes).unwrap();
            prop_assert!(!validate_card_number(&mutated));
        }

        #[test]
        fn never_panics(input in "\\PC*") {
            let _ = validate_card_number(&input);
            let _ = validate_cvv(&input);
        }
    }
}
