//! Error taxonomy for giftlist operations

use thiserror::Error;

/// The main error type for giftlist operations.
///
/// Every denial surfaces as an explicit variant; the policy engine never
/// recovers from one locally or filters silently.
#[derive(Debug, Error)]
pub enum GiftlistError {
    /// Malformed input: bad id format, missing required field, invalid email.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced user, list, gift or sharing code does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The policy engine denied the action for this viewer.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unique-constraint violation or state conflict (duplicate email,
    /// already-booked gift).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for giftlist operations
pub type Result<T> = std::result::Result<T, GiftlistError>;

impl From<heed::Error> for GiftlistError {
    fn from(e: heed::Error) -> Self {
        GiftlistError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for GiftlistError {
    fn from(e: std::io::Error) -> Self {
        GiftlistError::Storage(e.to_string())
    }
}
