//! Market metadata types for binary up/down markets.

use serde::Deserialize;
use serde_json::Value;

/// Fallback outcome labels when the upstream payload omits them.
/// Binary up/down markets are the domain default.
pub const FALLBACK_OUTCOME_LABELS: [&str; 2] = ["UP/YES", "DOWN/NO"];

/// Resolved metadata for a two-outcome market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDescriptor {
    /// Market slug (e.g., "btc-updown-5m-1770999900").
    pub slug: String,
    /// Event title; falls back to the slug.
    pub title: String,
    /// Market question text.
    pub question: String,
    /// End time as reported upstream, passed through verbatim.
    pub end_time: Option<String>,
    /// CLOB token IDs; index 0 pairs with label index 0.
    pub token_ids: [String; 2],
    /// Outcome labels, same order as the tokens.
    pub outcome_labels: [String; 2],
}

/// Raw event payload from the Gamma events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Event title.
    pub title: Option<String>,
    /// End date (ISO format, camelCase spelling).
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    /// End date under the snake_case spelling some payloads use.
    #[serde(rename = "end_date")]
    pub end_date_alt: Option<String>,
    /// Markets listed under the event.
    #[serde(default)]
    pub markets: Vec<MarketData>,
}

/// Raw market payload from the Gamma events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    /// Market question.
    pub question: Option<String>,
    /// CLOB token IDs; a JSON array or a string-encoded one.
    #[serde(rename = "clobTokenIds")]
    pub clob_token_ids: Option<Value>,
    /// Outcome labels; a JSON array or a string-encoded one.
    pub outcomes: Option<Value>,
    /// End date (ISO format).
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}
