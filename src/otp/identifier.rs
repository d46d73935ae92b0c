//! Identifier normalization and format checks (email or phone).

use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
}

/// Normalize an identifier for lookup/uniqueness checks.
///
/// Emails are trimmed and lowercased; phones lose common separators.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        normalize_phone(trimmed)
    }
}

#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Phone numbers are 8 to 15 digits with an optional leading `+`.
#[must_use]
pub fn valid_phone(phone_normalized: &str) -> bool {
    Regex::new(r"^\+?[0-9]{8,15}$").is_ok_and(|regex| regex.is_match(phone_normalized))
}

#[must_use]
pub fn classify(identifier_normalized: &str) -> Option<IdentifierKind> {
    if valid_email(identifier_normalized) {
        Some(IdentifierKind::Email)
    } else if valid_phone(identifier_normalized) {
        Some(IdentifierKind::Phone)
    } else {
        None
    }
}

/// A code is exactly six ASCII digits.
#[must_use]
pub fn code_shaped(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
