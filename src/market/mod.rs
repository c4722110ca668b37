//! Market metadata for binary up/down markets.
//!
//! This module handles:
//! - Descriptor and raw payload types
//! - Resolving a slug to token IDs and labels via the Gamma events endpoint

pub mod fetcher;
pub mod types;

pub use fetcher::fetch_market_data;
pub use types::{MarketDescriptor, FALLBACK_OUTCOME_LABELS};
