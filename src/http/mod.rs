//! Remote lookup capability.
//!
//! This module handles:
//! - The `JsonFetcher` trait consumed by every data component
//! - The production reqwest client with retry/backoff
//! - Mock fetcher and scheduler for tests

pub mod client;
pub mod mock;

pub use client::{HttpFetcher, JsonFetcher, RetryPolicy, Scheduler, TokioScheduler};
pub use mock::{MockConfig, MockFetcher, RecordingScheduler};
