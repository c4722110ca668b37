//! Resolving a market slug to descriptor metadata.

use std::time::Instant;

use serde_json::Value;
use tracing::{debug, instrument};

use super::types::{EventData, MarketDescriptor, FALLBACK_OUTCOME_LABELS};
use crate::error::MarketError;
use crate::http::JsonFetcher;
use crate::metrics;
use crate::probability::parse_json_array;

/// Items of a JSON-array-or-encoded-string field, stringified, nulls dropped.
fn string_items(value: &Value) -> Vec<String> {
    parse_json_array(value)
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// Resolve `slug` to a binary market descriptor via the events endpoint.
///
/// Selects the first market under the event exposing at least two token IDs
/// and keeps the first two, in payload order.
#[instrument(skip(fetcher, events_url), fields(slug = %slug))]
pub async fn fetch_market_data<F>(
    fetcher: &F,
    events_url: &str,
    slug: &str,
) -> Result<MarketDescriptor, MarketError>
where
    F: JsonFetcher + ?Sized,
{
    let start = Instant::now();
    let payload = fetcher
        .fetch_json(events_url, &[("slug", slug.to_string())])
        .await?;
    metrics::record_market_fetch_latency(start);

    let not_found = || MarketError::NotFound {
        slug: slug.to_string(),
    };

    let first_event = payload
        .as_array()
        .and_then(|events| events.first())
        .ok_or_else(not_found)?;
    let event: EventData = serde_json::from_value(first_event.clone()).map_err(|_| not_found())?;

    let EventData {
        title,
        end_date: event_end_date,
        end_date_alt: event_end_date_alt,
        markets,
    } = event;

    let mut chosen = None;
    for market in markets {
        let token_ids = market
            .clob_token_ids
            .as_ref()
            .map(string_items)
            .unwrap_or_default();
        if token_ids.len() >= 2 {
            debug!(token_count = token_ids.len(), "selected binary market");
            let pair = [token_ids[0].clone(), token_ids[1].clone()];
            chosen = Some((market, pair));
            break;
        }
    }
    let Some((market, token_ids)) = chosen else {
        return Err(MarketError::NoBinaryMarket {
            slug: slug.to_string(),
        });
    };

    let outcomes = market
        .outcomes
        .as_ref()
        .map(string_items)
        .unwrap_or_default();
    let outcome_labels = if outcomes.len() >= 2 {
        [outcomes[0].clone(), outcomes[1].clone()]
    } else {
        FALLBACK_OUTCOME_LABELS.map(str::to_string)
    };

    // Priority: market endDate, then the event's two spellings.
    let end_time = [market.end_date, event_end_date, event_end_date_alt]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty());

    Ok(MarketDescriptor {
        slug: slug.to_string(),
        title: title
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| slug.to_string()),
        question: market.question.unwrap_or_default(),
        end_time,
        token_ids,
        outcome_labels,
    })
}
