//! Textual form of single-use user tokens.
//!
//! Tokens are 128-bit identifiers. On the wire (links, emails) they are
//! written as 32 lowercase hex digits without separators.

use uuid::Uuid;

/// Builds a token identifier from 16 random bytes.
///
/// The version and variant bits are set so the value is a valid v4 UUID.
pub fn token_from_random_bytes(bytes: [u8; 16]) -> Uuid {
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Formats a token for use in URLs and emails.
pub fn format_token(token: &Uuid) -> String {
    token.simple().to_string()
}

/// Parses a token in either the compact or the hyphenated form.
pub fn parse_token(value: &str) -> Option<Uuid> {
    Uuid::try_parse(value.trim()).ok()
}
