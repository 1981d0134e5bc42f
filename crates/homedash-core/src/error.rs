//! Error types for homedash-core.
//!
//! # Error Recovery Strategies
//!
//! Nothing in this engine terminates the process. Errors are contained at
//! the slot boundary and turn into stale or absent cards.
//!
//! | Error | Retried by the orchestrator | Effect on the slot |
//! |-------|-----------------------------|--------------------|
//! | [`QueryError::ConnectionError`] | Yes, per [`crate::RetryConfig`] | Stale or absent |
//! | [`QueryError::NotFound`] | No | Stale or absent |
//! | [`QueryError::MalformedResponse`] | No | Stale or absent |
//! | [`ParseError`] | No | Stale or absent |
//! | [`CycleError::Aborted`] | No | Stale or absent |
//!
//! The query client itself never retries; retrying is a policy of
//! [`crate::refresh::RefreshOrchestrator`].

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use homedash_types::ParseError;

/// Errors returned by a [`crate::TelemetryStore`].
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// The store answered but holds no rows for the alias.
    #[error("No rows found for alias '{alias}'")]
    NotFound {
        /// The alias that was queried.
        alias: String,
    },

    /// The store could not be reached or did not answer in time.
    #[error("Store unreachable: {0}")]
    ConnectionError(String),

    /// The store replied with something that is not the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl QueryError {
    /// Create a not-found error for an alias.
    pub fn not_found(alias: impl Into<String>) -> Self {
        Self::NotFound {
            alias: alias.into(),
        }
    }

    /// Create a connection error for a call that exceeded its deadline.
    pub fn timeout(operation: &str, duration: Duration) -> Self {
        Self::ConnectionError(format!("{} timed out after {:?}", operation, duration))
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Whether a retry has any chance of producing a different outcome.
    ///
    /// Only transport failures are transient. An empty series or a
    /// response of the wrong shape will look the same on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

/// A slot-level failure during a refresh cycle.
///
/// Wraps the underlying query or parse error with the slot it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CycleError {
    /// Fetching the newest row failed.
    #[error("Slot '{slot}': {source}")]
    Query {
        /// Slot identifier.
        slot: String,
        #[source]
        source: QueryError,
    },

    /// The row was fetched but could not be normalized.
    #[error("Slot '{slot}': {source}")]
    Parse {
        /// Slot identifier.
        slot: String,
        #[source]
        source: ParseError,
    },

    /// The slot's fetch task ended without producing a result.
    #[error("Slot '{slot}': fetch task aborted: {reason}")]
    Aborted {
        /// Slot identifier.
        slot: String,
        /// What the runtime reported.
        reason: String,
    },
}

impl CycleError {
    /// The slot this error belongs to.
    pub fn slot(&self) -> &str {
        match self {
            Self::Query { slot, .. } | Self::Parse { slot, .. } | Self::Aborted { slot, .. } => {
                slot
            }
        }
    }

    /// Attach slot context to a query error.
    pub fn query(slot: impl Into<String>, source: QueryError) -> Self {
        Self::Query {
            slot: slot.into(),
            source,
        }
    }

    /// Attach slot context to a parse error.
    pub fn parse(slot: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            slot: slot.into(),
            source,
        }
    }
}

/// Result type alias for store queries.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
