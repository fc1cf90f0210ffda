// SPDX-License-Identifier: Apache-2.0

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::{ValidationError, ValidationResult};

const EXPIRY_FORMAT: &str = "MM/YY";

/// A parsed `MM/YY` card expiry. `year` is the two-digit year as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    month: u32,
    year: u32,
}

impl Expiry {
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    /// True when the card expired before `today`'s month.
    ///
    /// Only the last two digits of `today`'s year are compared, and a card
    /// stays valid through the whole of its expiry month.
    pub fn is_expired_at(&self, today: NaiveDate) -> bool {
        let current_year = today.year().rem_euclid(100) as u32;
        let current_month = today.month();
        self.year < current_year || (self.year == current_year && self.month < current_month)
    }

    pub fn format_short(&self) -> String {
        format!("{:02}/{:02}", self.month, self.year)
    }
}

/// Parses `MM/YY` without checking whether the date has passed.
pub fn parse_expiry(input: &str) -> ValidationResult<Expiry> {
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }

    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b'/'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(ValidationError::invalid_format(EXPIRY_FORMAT));
    }

    let month = two_digits(&bytes[..2]);
    let year = two_digits(&bytes[3..]);
    if !(1..=12).contains(&month) {
        return Err(ValidationError::InvalidMonth { month });
    }

    Ok(Expiry { month, year })
}

/// Checks an `MM/YY` expiry against an explicit current date.
pub fn check_expiry_at(input: &str, today: NaiveDate) -> ValidationResult<Expiry> {
    let expiry = parse_expiry(input)?;
    if expiry.is_expired_at(today) {
        return Err(ValidationError::Expired);
    }
    Ok(expiry)
}

/// Returns true for a well-formed `MM/YY` that is not in the past. There is
/// no upper bound on how far in the future the date may be.
pub fn validate_expiry_date(input: &str) -> bool {
    validate_expiry_date_at(input, Utc::now().date_naive())
}

pub fn validate_expiry_date_at(input: &str, today: NaiveDate) -> bool {
    check_expiry_at(input, today).is_ok()
}

fn two_digits(bytes: &[u8]) -> u32 {
    u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn relative_to_fixed_now() {
        let today = june_2024();
        assert!(validate_expiry_date_at("12/25", today));
        assert!(!validate_expiry_date_at("01/20", today));
        assert!(validate_expiry_date_at("06/24", today));
        assert!(!validate_expiry_date_at("05/24", today));
        assert!(validate_expiry_date_at("07/24", today));
        assert!(!validate_expiry_date_at("12/23", today));
    }

    #[test]
    fn far_future_is_accepted() {
        assert!(validate_expiry_date_at("01/99", june_2024()));
    }

    #[test]
    fn malformed_input_rejected() {
        let today = june_2024();
        for input in ["", "1225", "12-25", "12/2025", "1/25", "ab/cd", "12/2", " 12/25", "12/25 "] {
            assert!(!validate_expiry_date_at(input, today), "{input:?} should be rejected");
        }
    }

    #[test]
    fn month_out_of_range() {
        assert_eq!(parse_expiry("00/25"), Err(ValidationError::InvalidMonth { month: 0 }));
        assert_eq!(parse_expiry("13/25"), Err(ValidationError::InvalidMonth { month: 13 }));
    }

    #[test]
    fn parse_keeps_expired_dates() {
        let expiry = parse_expiry("01/20").unwrap();
        assert_eq!(expiry.month(), 1);
        assert_eq!(expiry.year(), 20);
        assert_eq!(expiry.format_short(), "01/20");
        assert!(expiry.is_expired_at(june_2024()));
        assert_eq!(check_expiry_at("01/20", june_2024()), Err(ValidationError::Expired));
    }

    #[test]
    fn uses_current_clock() {
        let today = Utc::now().date_naive();
        let current = format!("{:02}/{:02}", today.month(), today.year() % 100);
        assert!(validate_expiry_date(&current));
    }
}
