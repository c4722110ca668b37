//! Integration tests for the probability tracker.
//!
//! The mock-driven tests run offline. The `#[ignore]`d ones hit the real
//! Polymarket APIs; run them with: cargo test --test tracker -- --ignored

use polymarket_tracker::api::display_probabilities;
use polymarket_tracker::config::Config;
use polymarket_tracker::http::{HttpFetcher, MockFetcher};
use polymarket_tracker::period;
use polymarket_tracker::tracker::collect_event_probabilities;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use time::OffsetDateTime;

const SLUG: &str = "btc-updown-5m-1770999900";

fn fixture_fetcher(config: &Config) -> MockFetcher {
    let fetcher = MockFetcher::new();
    fetcher.insert(
        &config.gamma_events_url,
        &[("slug", SLUG)],
        json!([{
            "title": "Bitcoin Up or Down",
            "endDate": "2026-02-13T15:05:00Z",
            "markets": [{
                "question": "Will BTC go up?",
                "clobTokenIds": "[\"111\", \"222\"]",
                "outcomes": "[\"Up\", \"Down\"]",
            }],
        }]),
    );
    // mid 0.48
    fetcher.insert(
        &config.clob_book_url,
        &[("token_id", "111")],
        json!({
            "bids": [{"price": "0.44"}, {"price": "0.46"}],
            "asks": [{"price": "0.50"}, {"price": "0.52"}],
            "last_trade_price": "0.43",
        }),
    );
    // mid 0.56
    fetcher.insert(
        &config.clob_book_url,
        &[("token_id", "222")],
        json!({
            "bids": [{"price": "0.52"}, {"price": "0.50"}],
            "asks": [{"price": "0.60"}, {"price": "0.62"}],
            "last_trade_price": "0.57",
        }),
    );
    fetcher
}

#[tokio::test]
async fn end_to_end_probabilities_from_fixture_books() {
    let config = Config::default();
    let fetcher = fixture_fetcher(&config);

    let result = collect_event_probabilities(&fetcher, &config, SLUG)
        .await
        .expect("collect");

    // Last trades already sum to 1, so direct passes through untouched.
    assert_eq!(result.direct.first, Some(dec!(0.43)));
    assert_eq!(result.direct.second, Some(dec!(0.57)));

    // Mids are 0.48 and 0.56; normalization rescales them onto the simplex.
    let (mid_first, mid_second) = (result.mid.first.unwrap(), result.mid.second.unwrap());
    let tolerance = dec!(0.00000001);
    assert!((mid_first + mid_second - Decimal::ONE).abs() <= tolerance);
    assert!(mid_first < mid_second);
    assert!((mid_first - dec!(0.48) / dec!(1.04)).abs() <= tolerance);

    // Raw snapshots ride along, token order preserved.
    assert_eq!(result.snapshots[0].token_id, "111");
    assert_eq!(result.snapshots[0].mid_price, Some(dec!(0.48)));
    assert_eq!(result.snapshots[1].mid_price, Some(dec!(0.56)));

    // The display pair follows the mid/direct preference and stays in [0, 1].
    let displayed = display_probabilities(&result, true);
    assert_eq!(displayed[0], mid_first);
    let displayed = display_probabilities(&result, false);
    assert_eq!(displayed, [dec!(0.43), dec!(0.57)]);
}

#[tokio::test]
async fn aggregation_fails_whole_when_one_book_is_unreachable() {
    let config = Config::default();
    let fetcher = MockFetcher::new();
    fetcher.insert(
        &config.gamma_events_url,
        &[("slug", SLUG)],
        json!([{"markets": [{"clobTokenIds": ["111", "222"]}]}]),
    );
    fetcher.insert(
        &config.clob_book_url,
        &[("token_id", "111")],
        json!({"bids": [{"price": "0.4"}], "asks": [{"price": "0.5"}]}),
    );

    assert!(collect_event_probabilities(&fetcher, &config, SLUG)
        .await
        .is_err());
}

#[test]
fn period_clock_walks_contiguous_windows() {
    let config = Config::default();
    let t0 = OffsetDateTime::from_unix_timestamp(1771000000).unwrap();
    let slug = period::current_slug(&config.asset, config.interval_minutes, t0);

    // Still live mid-period.
    assert_eq!(
        period::advance_slug(&slug, &config.asset, config.interval_minutes, t0),
        None
    );

    // Inside the early-roll margin the clock hands over the next window,
    // and that window is exactly what a cold start would derive once the
    // boundary has passed.
    let near_boundary = t0 + time::Duration::seconds(196);
    let next = period::advance_slug(&slug, &config.asset, config.interval_minutes, near_boundary)
        .expect("rolls at the margin");
    let after_boundary = t0 + time::Duration::seconds(300);
    assert_eq!(
        next,
        period::current_slug(&config.asset, config.interval_minutes, after_boundary)
    );

    // Periods are contiguous and non-overlapping.
    let start = period::extract_period_start(&slug).unwrap();
    let next_start = period::extract_period_start(&next).unwrap();
    assert_eq!(next_start - start, config.interval_seconds());
}

/// Live check against the real Gamma/CLOB APIs.
#[tokio::test]
#[ignore = "requires network access"]
async fn live_collect_current_period() {
    let config = Config::default();
    let fetcher = HttpFetcher::new(&config);
    let slug = period::current_slug(
        &config.asset,
        config.interval_minutes,
        OffsetDateTime::now_utc(),
    );

    match collect_event_probabilities(&fetcher, &config, &slug).await {
        Ok(result) => {
            println!("Collected {}:", result.slug);
            println!("  {}: {:?}", result.outcome_labels[0], result.mid.first);
            println!("  {}: {:?}", result.outcome_labels[1], result.mid.second);

            if let (Some(first), Some(second)) = (result.mid.first, result.mid.second) {
                let tolerance = dec!(0.00000001);
                assert!((first + second - Decimal::ONE).abs() <= tolerance);
            }
        }
        Err(e) => {
            // The market for the freshly-derived slug may not exist yet.
            println!("No live market for {}: {}", slug, e);
        }
    }
}

/// Live check of the spot price enrichment path.
#[tokio::test]
#[ignore = "requires network access"]
async fn live_spot_price_lookup() {
    use polymarket_tracker::tracker::fetch_spot_price;

    let config = Config::default();
    let fetcher = HttpFetcher::new(&config);

    let price = fetch_spot_price(&fetcher, &config.spot_price_url, &config.spot_asset_id).await;
    println!("{} spot price: {:?}", config.spot_asset_id, price);

    if let Some(price) = price {
        assert!(price > Decimal::ZERO);
    }
}
