// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strip_whitespace;

/// Card issuer network, derived from the leading digits of the card number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Elo,
    Unknown,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "visa",
            CardBrand::Mastercard => "mastercard",
            CardBrand::Amex => "amex",
            CardBrand::Discover => "discover",
            CardBrand::Elo => "elo",
            CardBrand::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MASTERCARD_PREFIXES: &[&str] = &["51", "52", "53", "54", "55"];
const AMEX_PREFIXES: &[&str] = &["34", "37"];
const DISCOVER_PREFIXES: &[&str] = &["6011", "65"];
// Elo BINs that do not collide with an earlier brand in the check order.
const ELO_PREFIXES: &[&str] = &["5041", "5066", "5067", "509", "6277", "6362", "6363"];

/// Classifies a card number by issuer prefix.
///
/// Brands are tried in a fixed order (Visa, Mastercard, Amex, Discover, Elo)
/// and the first match wins. Anything else, including empty input, is
/// [`CardBrand::Unknown`].
pub fn card_brand(input: &str) -> CardBrand {
    let cleaned = strip_whitespace(input);
    let has_prefix = |prefixes: &[&str]| prefixes.iter().any(|p| cleaned.starts_with(p));

    if cleaned.starts_with('4') {
        CardBrand::Visa
    } else if has_prefix(MASTERCARD_PREFIXES) {
        CardBrand::Mastercard
    } else if has_prefix(AMEX_PREFIXES) {
        CardBrand::Amex
    } else if has_prefix(DISCOVER_PREFIXES) {
        CardBrand::Discover
    } else if has_prefix(ELO_PREFIXES) {
        CardBrand::Elo
    } else {
        CardBrand::Unknown
    }
}
