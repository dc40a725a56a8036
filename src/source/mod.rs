//! Availability source client and record normalization
//!
//! This module owns the two leaf concerns of the poll pipeline:
//!
//! - [`client::AvailabilitySource`] - the HTTP collaborator returning raw,
//!   loosely-structured availability data for a configured date range
//! - [`normalize`] - turning heterogeneous availability records into the
//!   canonical set of comparable identifiers deduplication depends on
//!
//! No other module inspects raw payload shape.

pub mod client;
pub mod normalize;

use thiserror::Error;

pub use client::{AvailabilityRequest, AvailabilitySource};
pub use normalize::{normalize, normalize_all};

/// Errors that can occur while fetching availability
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Non-success status from the source
    #[error("Source returned status {0}")]
    Status(u16),

    /// Success status but unparseable body
    #[error("Malformed response body: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether this failure counts as "source unavailable" and drives
    /// backoff. A malformed body does not: it is treated as "no data this
    /// cycle" and leaves the backoff level untouched.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::Malformed(_))
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        true
    }
}
