// SPDX-License-Identifier: Apache-2.0

use std::sync::OnceLock;

use regex::Regex;

/// Something shaped like `local@domain.tld`.
///
/// This is a light heuristic for catching typos at checkout, not RFC 5322
/// validation, and it says nothing about deliverability. Exactly one `@`, no
/// whitespace anywhere, and a dot somewhere after the `@`.
pub fn validate_email(input: &str) -> bool {
    email_pattern().is_match(input)
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}
