//! Error types for data parsing in fueltrack-types.

use thiserror::Error;

/// Errors that can occur when parsing price data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A timestamp that is neither RFC 3339 nor a naive ISO 8601 date-time.
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// A price string that is not a decimal number.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

/// Result type alias using fueltrack-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
