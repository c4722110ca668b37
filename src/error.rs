//! Unified error types for the tracker.

use thiserror::Error;

/// Unified error type for the tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Market-related error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),
}

/// Market resolution and sampling errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// The remote lookup failed after exhausting retries.
    #[error(transparent)]
    RemoteRequest(#[from] RemoteRequestError),

    /// The slug does not resolve to any event.
    #[error("no event found for slug {slug}")]
    NotFound {
        /// The slug that failed to resolve.
        slug: String,
    },

    /// The event exists but no market exposes a usable two-token pair.
    #[error("no binary market with two token ids under event {slug}")]
    NoBinaryMarket {
        /// The event slug.
        slug: String,
    },
}

/// Transport failure from the remote lookup capability.
///
/// Collapses status, connection and decode failures into a single kind once
/// retries are exhausted; the last underlying failure is carried as text.
#[derive(Error, Debug)]
#[error("request failed after {attempts} attempts: {url}: {reason}")]
pub struct RemoteRequestError {
    /// The URL that failed.
    pub url: String,
    /// Total attempts made (initial request plus retries).
    pub attempts: u32,
    /// Description of the last failure.
    pub reason: String,
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, TrackerError>;
