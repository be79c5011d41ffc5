//! Identifier and input validation.
//!
//! Every id that crosses the API boundary (path params, sharing codes) is a
//! uuid. Malformed ids must fail here, before any policy decision or storage
//! lookup runs.

use uuid::Uuid;

use crate::error::{GiftlistError, Result};

/// Parse an id-shaped path parameter. Anything that is not a well-formed
/// uuid is a validation failure, not a lookup miss.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::try_parse(raw)
        .map_err(|_| GiftlistError::Validation(format!("'{}' is not a valid id", raw)))
}

/// Generate a fresh record id
#[inline]
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

/// Minimal email shape check: one '@', non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Require a non-empty, non-blank field
pub fn require_field(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(GiftlistError::Validation(format!("field '{}' is missing", name)))
    } else {
        Ok(())
    }
}
