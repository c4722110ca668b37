//! HTTP API module for health, status, and metrics endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::{display_probabilities, AppState, ProbabilityReport};
pub use routes::create_router;
