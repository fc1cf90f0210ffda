// SPDX-License-Identifier: Apache-2.0

//! CPF (Brazilian individual taxpayer number) checksum.

const CPF_LENGTH: usize = 11;

/// Returns true if `input` holds a CPF with two correct check digits.
///
/// Formatting characters are dropped first, so both `111.444.777-35` and
/// `11144477735` are accepted. Numbers made of a single repeated digit pass
/// the checksum but are never issued, and are rejected.
pub fn validate_cpf(input: &str) -> bool {
    let digits: Vec<u8> = input
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect();

    if digits.len() != CPF_LENGTH {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Computes both check digits for the first nine digits of `input`.
///
/// Returns `None` when fewer than nine digits are present.
pub fn cpf_check_digits(input: &str) -> Option<(u8, u8)> {
    let mut base: Vec<u8> = input
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .take(9)
        .collect();
    if base.len() != 9 {
        return None;
    }

    let first = check_digit(&base);
    base.push(first);
    let second = check_digit(&base);
    Some((first, second))
}

/// Weighted mod-11 pass. Weights run from `len + 1` down to 2.
fn check_digit(digits: &[u8]) -> u8 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| u32::from(*d) * (top - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 | 11 => 0,
        r => r as u8,
    }
}
