//! Fetching and shaping a single token's order book.

use std::time::Instant;

use tracing::instrument;

use super::types::OrderBookSnapshot;
use crate::error::MarketError;
use crate::http::JsonFetcher;
use crate::metrics;
use crate::probability::{extract_prices, to_decimal};

/// Sample one token's book into a snapshot.
///
/// Missing or malformed sub-fields degrade to `None` fields; only
/// transport-level failure from the lookup capability is an error.
#[instrument(skip(fetcher, book_url), fields(token_id = %token_id))]
pub async fn sample_order_book<F>(
    fetcher: &F,
    book_url: &str,
    token_id: &str,
) -> Result<OrderBookSnapshot, MarketError>
where
    F: JsonFetcher + ?Sized,
{
    let start = Instant::now();
    let payload = fetcher
        .fetch_json(book_url, &[("token_id", token_id.to_string())])
        .await?;
    metrics::record_book_fetch_latency(start, token_id);

    let bids = extract_prices(payload.get("bids"));
    let asks = extract_prices(payload.get("asks"));
    let last_trade_price = payload.get("last_trade_price").and_then(to_decimal);

    Ok(OrderBookSnapshot::from_levels(
        token_id,
        last_trade_price,
        &bids,
        &asks,
    ))
}
