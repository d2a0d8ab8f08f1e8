//! Error types used by the event bus.
//!
//! The bus has a deliberately small failure surface: every invalid input
//! that Rust's type system can express (a missing envelope, a missing
//! payload type) is rejected at compile time, so the only runtime
//! validation left is the correlation id content check.

use thiserror::Error;

/// # Errors produced by bus operations.
///
/// Raised synchronously, before any bus state is mutated, so a failed call
/// never leaves the bus in an inconsistent state. All variants are
/// caller-recoverable: fix the input and retry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A correlation id was supplied but empty.
    ///
    /// Returned by [`Envelope::new`](crate::Envelope::new) and the
    /// correlation-filtered subscribe/attach operations.
    #[error("correlation id must not be empty")]
    EmptyCorrelationId,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use corrbus::BusError;
    ///
    /// assert_eq!(BusError::EmptyCorrelationId.as_label(), "empty_correlation_id");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::EmptyCorrelationId => "empty_correlation_id",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::EmptyCorrelationId => "correlation id must not be empty".to_string(),
        }
    }
}
