//! Error types for row normalization in homedash-types.

use thiserror::Error;

/// Errors that can occur when turning a raw telemetry row into a typed reading.
///
/// This error type is transport-agnostic and does not include store or
/// network errors (those belong in homedash-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The timestamp column could not be parsed as an ISO-8601 instant.
    ///
    /// Carries the original text so the malformed value shows up in logs.
    #[error("Invalid timestamp: {raw:?}")]
    InvalidTimestamp {
        /// The value exactly as the store returned it.
        raw: String,
    },

    /// A required column was absent from the row or held `null`.
    #[error("Missing field '{field}' at column {index}")]
    MissingField {
        /// Name of the field that was expected.
        field: String,
        /// Column position in the row.
        index: usize,
    },

    /// A column that should hold a number held something else.
    #[error("Field '{field}' is not numeric: {value}")]
    InvalidNumber {
        /// Name of the field.
        field: String,
        /// Textual form of the offending value.
        value: String,
    },
}

impl ParseError {
    /// Create an invalid timestamp error from the raw text.
    pub fn invalid_timestamp(raw: impl Into<String>) -> Self {
        Self::InvalidTimestamp { raw: raw.into() }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>, index: usize) -> Self {
        Self::MissingField {
            field: field.into(),
            index,
        }
    }
}

/// Result type alias using homedash-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
