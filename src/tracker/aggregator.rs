//! One full probability collection cycle for a market slug.

use futures::future::try_join;
use serde::Serialize;
use tracing::instrument;

use crate::config::Config;
use crate::error::MarketError;
use crate::http::JsonFetcher;
use crate::market::{fetch_market_data, MarketDescriptor};
use crate::orderbook::{sample_order_book, OrderBookSnapshot};
use crate::probability::ProbabilityPair;

/// Aggregated result of one collection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct EventProbabilities {
    /// The slug the cycle ran for.
    pub slug: String,
    /// Event title.
    pub title: String,
    /// Market question text.
    pub question: String,
    /// Upstream end time, verbatim.
    pub end_time: Option<String>,
    /// Outcome labels, token order.
    pub outcome_labels: [String; 2],
    /// CLOB token IDs, payload order.
    pub token_ids: [String; 2],
    /// Normalized last-trade probabilities.
    pub direct: ProbabilityPair,
    /// Normalized mid-price probabilities.
    pub mid: ProbabilityPair,
    /// Raw snapshots, token order preserved.
    pub snapshots: [OrderBookSnapshot; 2],
}

/// Resolve the market, sample both tokens and normalize the probabilities.
///
/// The two samples run concurrently and both must succeed; any failure
/// aborts the cycle and surfaces unchanged, with no partial result.
#[instrument(skip(fetcher, config), fields(slug = %slug))]
pub async fn collect_event_probabilities<F>(
    fetcher: &F,
    config: &Config,
    slug: &str,
) -> Result<EventProbabilities, MarketError>
where
    F: JsonFetcher + ?Sized,
{
    let market = fetch_market_data(fetcher, &config.gamma_events_url, slug).await?;
    let MarketDescriptor {
        title,
        question,
        end_time,
        token_ids,
        outcome_labels,
        ..
    } = market;

    let (first, second) = try_join(
        sample_order_book(fetcher, &config.clob_book_url, &token_ids[0]),
        sample_order_book(fetcher, &config.clob_book_url, &token_ids[1]),
    )
    .await?;

    let direct = ProbabilityPair::normalized(first.last_trade_price, second.last_trade_price);
    let mid = ProbabilityPair::normalized(first.mid_price, second.mid_price);

    Ok(EventProbabilities {
        slug: slug.to_string(),
        title,
        question,
        end_time,
        outcome_labels,
        token_ids,
        direct,
        mid,
        snapshots: [first, second],
    })
}
