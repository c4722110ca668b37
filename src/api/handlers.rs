//! HTTP API handlers and presentation-layer state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::orderbook::OrderBookSnapshot;
use crate::period::PeriodInfo;
use crate::probability::ProbabilityPair;
use crate::tracker::EventProbabilities;

/// Application state shared with handlers.
///
/// Owns everything the core must not: the latest report, the per-slug trend
/// history, the ready flag. Updated only after a full successful cycle.
#[derive(Clone)]
pub struct AppState {
    /// Whether at least one cycle has completed successfully.
    pub ready: Arc<AtomicBool>,
    /// Current market slug.
    pub market_slug: Arc<tokio::sync::RwLock<Option<String>>>,
    /// Latest successful report.
    pub latest: Arc<tokio::sync::RwLock<Option<ProbabilityReport>>>,
    /// Last displayed pair per slug, for trend deltas.
    history: Arc<DashMap<String, (Decimal, Decimal)>>,
    /// Prometheus render handle, when metrics are installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(metrics: Option<PrometheusHandle>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            market_slug: Arc::new(tokio::sync::RwLock::new(None)),
            latest: Arc::new(tokio::sync::RwLock::new(None)),
            history: Arc::new(DashMap::new()),
            metrics,
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Record the displayed pair for a slug, returning the first-outcome
    /// delta against the previous full cycle for the same slug.
    pub fn record_trend(&self, slug: &str, displayed: [Decimal; 2]) -> Option<Decimal> {
        let previous = self
            .history
            .insert(slug.to_string(), (displayed[0], displayed[1]));
        previous.map(|(prev_first, _)| displayed[0] - prev_first)
    }
}

/// The JSON document served to the display layer.
#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityReport {
    /// Market slug the report was collected for.
    pub slug: String,
    /// Event title.
    pub title: String,
    /// Market question text.
    pub question: String,
    /// Upstream end time, verbatim.
    pub end_time: Option<String>,
    /// Outcome labels, token order.
    pub outcome_labels: [String; 2],
    /// Normalized last-trade probabilities.
    pub direct_probabilities: ProbabilityPair,
    /// Normalized mid-price probabilities.
    pub mid_probabilities: ProbabilityPair,
    /// Raw per-token snapshots.
    pub snapshots: [OrderBookSnapshot; 2],
    /// Reference asset spot price, when the lookup succeeded.
    pub spot_price_usd: Option<Decimal>,
    /// Period window and countdown.
    pub period: Option<PeriodInfo>,
    /// Clamped pair actually shown, per the mid/direct preference.
    pub displayed: [Decimal; 2],
    /// First-outcome delta vs the previous cycle for this slug.
    pub trend: Option<Decimal>,
    /// When the cycle completed (RFC 3339).
    pub updated_at: String,
}

impl ProbabilityReport {
    /// Assemble a report from one successful cycle.
    pub fn from_cycle(
        result: EventProbabilities,
        spot_price_usd: Option<Decimal>,
        period: Option<PeriodInfo>,
        displayed: [Decimal; 2],
        trend: Option<Decimal>,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self {
            slug: result.slug,
            title: result.title,
            question: result.question,
            end_time: result.end_time,
            outcome_labels: result.outcome_labels,
            direct_probabilities: result.direct,
            mid_probabilities: result.mid,
            snapshots: result.snapshots,
            spot_price_usd,
            period,
            displayed,
            trend,
            updated_at: updated_at.format(&Rfc3339).unwrap_or_default(),
        }
    }
}

fn clamp_unit(value: Decimal) -> Decimal {
    value.min(Decimal::ONE).max(Decimal::ZERO)
}

/// Pick the pair shown to users: mid-price when preferred, direct otherwise.
/// Missing sides render as 0 and everything is clamped into [0, 1].
pub fn display_probabilities(result: &EventProbabilities, prefer_mid: bool) -> [Decimal; 2] {
    let pair = if prefer_mid { result.mid } else { result.direct };
    [
        clamp_unit(pair.first.unwrap_or(Decimal::ZERO)),
        clamp_unit(pair.second.unwrap_or(Decimal::ZERO)),
    ]
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether at least one cycle has completed.
    pub ready: bool,
    /// Current market slug if available.
    pub market: Option<String>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let market = state.market_slug.read().await.clone();

    let response = ReadyResponse {
        ready: is_ready,
        market,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Latest probability report, or 503 before the first successful cycle.
pub async fn probabilities(State(state): State<AppState>) -> impl IntoResponse {
    match state.latest.read().await.clone() {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Prometheus metrics in text exposition format.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn result_with_pairs(mid: ProbabilityPair, direct: ProbabilityPair) -> EventProbabilities {
        EventProbabilities {
            slug: "btc-updown-5m-1770999900".to_string(),
            title: "Bitcoin Up or Down".to_string(),
            question: String::new(),
            end_time: None,
            outcome_labels: ["Up".to_string(), "Down".to_string()],
            token_ids: ["111".to_string(), "222".to_string()],
            direct,
            mid,
            snapshots: [
                OrderBookSnapshot::from_levels("111", None, &[], &[]),
                OrderBookSnapshot::from_levels("222", None, &[], &[]),
            ],
        }
    }

    #[test]
    fn app_state_ready_toggle() {
        let state = AppState::new(None);
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[test]
    fn record_trend_returns_delta_after_first_cycle() {
        let state = AppState::new(None);
        assert_eq!(
            state.record_trend("btc-updown-5m-0", [dec!(0.4), dec!(0.6)]),
            None
        );
        assert_eq!(
            state.record_trend("btc-updown-5m-0", [dec!(0.45), dec!(0.55)]),
            Some(dec!(0.05))
        );
        // other slugs track independently
        assert_eq!(
            state.record_trend("btc-updown-5m-300", [dec!(0.5), dec!(0.5)]),
            None
        );
    }

    #[test]
    fn display_probabilities_prefers_the_requested_pair() {
        let result = result_with_pairs(
            ProbabilityPair {
                first: Some(dec!(0.475)),
                second: Some(dec!(0.525)),
            },
            ProbabilityPair {
                first: Some(dec!(0.43)),
                second: Some(dec!(0.57)),
            },
        );
        assert_eq!(
            display_probabilities(&result, true),
            [dec!(0.475), dec!(0.525)]
        );
        assert_eq!(
            display_probabilities(&result, false),
            [dec!(0.43), dec!(0.57)]
        );
    }

    #[test]
    fn display_probabilities_clamps_and_defaults() {
        let result = result_with_pairs(
            ProbabilityPair {
                first: Some(dec!(1.2)),
                second: None,
            },
            ProbabilityPair {
                first: None,
                second: None,
            },
        );
        assert_eq!(display_probabilities(&result, true), [dec!(1), dec!(0)]);
        assert_eq!(display_probabilities(&result, false), [dec!(0), dec!(0)]);
    }
}
