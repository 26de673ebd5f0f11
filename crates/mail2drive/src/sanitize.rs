//! Helpers for sanitizing data before it reaches log lines.
//!
//! The log file is written on disk next to the binary and may be shared for
//! debugging. These functions keep mailbox addresses and remote error bodies
//! (which can echo tokens) short and partially masked.

/// Maximum length for remote error bodies included in logs and errors.
pub const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Masks the local part of an email address, keeping its first character.
///
/// - `alice@example.com` → `a****@example.com`
/// - `not-an-address` → `n****`
pub fn redact_address(address: &str) -> String {
    let (local, domain) = match address.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (address, None),
    };

    let masked = match local.chars().next() {
        Some(first) => format!("{}****", first),
        None => "****".to_string(),
    };

    match domain {
        Some(domain) => format!("{}@{}", masked, domain),
        None => masked,
    }
}

/// Truncates a remote response body to [`MAX_ERROR_BODY_LENGTH`] characters.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}
