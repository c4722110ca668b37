//! Best-effort reference asset spot price for display enrichment.

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::http::JsonFetcher;
use crate::metrics;
use crate::probability::to_decimal;

/// Fetch the reference asset spot price in USD.
///
/// Strictly best-effort: transport failure or an unexpected payload shape
/// degrades to `None`. Probability computation never depends on this value.
#[instrument(skip(fetcher, price_url))]
pub async fn fetch_spot_price<F>(fetcher: &F, price_url: &str, asset_id: &str) -> Option<Decimal>
where
    F: JsonFetcher + ?Sized,
{
    let params = [
        ("ids", asset_id.to_string()),
        ("vs_currencies", "usd".to_string()),
    ];
    let payload = match fetcher.fetch_json(price_url, &params).await {
        Ok(payload) => payload,
        Err(err) => {
            metrics::inc_spot_price_failures();
            warn!(error = %err, "spot price lookup failed");
            return None;
        }
    };
    payload.get(asset_id)?.get("usd").and_then(to_decimal)
}
