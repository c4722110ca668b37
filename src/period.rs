//! Period clock for time-boxed up/down market slugs.
//!
//! Slugs encode their period start as a trailing unix timestamp
//! (e.g. "btc-updown-5m-1770999900"). This module derives everything from
//! that: time remaining, the next slug, the rollover decision, and a
//! cold-start slug computed purely from the wall clock. All functions are
//! pure; the caller supplies "now".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

/// Roll this many seconds before the period actually ends, to mask poll
/// latency around the boundary.
pub const ROLLOVER_MARGIN_SECONDS: i64 = 5;

/// Fixed market reference offset: Eastern Time pinned at UTC-5 year-round.
/// Upstream slugs track this shifted clock, daylight saving ignored.
const REFERENCE_OFFSET: Duration = Duration::hours(-5);

/// Slug shape: optional dash-terminated prefix plus a trailing timestamp.
static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+-)?(\d+)$").expect("valid regex"));

/// Extract the period start timestamp from a slug.
///
/// The component after the last '-' (or the whole slug when there is none)
/// is parsed as unix seconds. `None` when it is not an integer.
pub fn extract_period_start(slug: &str) -> Option<i64> {
    slug.rsplit('-').next()?.parse().ok()
}

/// Replace the trailing timestamp with the start of the following period.
///
/// Slugs without a parseable timestamp are returned unchanged.
pub fn next_slug(slug: &str, interval_seconds: i64) -> String {
    let Some(captures) = SLUG_PATTERN.captures(slug) else {
        return slug.to_string();
    };
    let prefix = captures.get(1).map_or("", |m| m.as_str());
    let start: i64 = match captures.get(2).expect("capture exists").as_str().parse() {
        Ok(start) => start,
        Err(_) => return slug.to_string(),
    };
    format!("{}{}", prefix, start + interval_seconds)
}

/// Seconds left in the period starting at `period_start`, floored at 0.
pub fn time_remaining(period_start: i64, interval_seconds: i64, now: i64) -> i64 {
    (period_start + interval_seconds - now).max(0)
}

/// Whether the tracker should move on to the next period.
///
/// True once `time_remaining` drops to the rollover margin. Slugs without a
/// parseable timestamp never roll.
pub fn should_roll(slug: &str, interval_seconds: i64, now: i64) -> bool {
    match extract_period_start(slug) {
        Some(start) => time_remaining(start, interval_seconds, now) <= ROLLOVER_MARGIN_SECONDS,
        None => false,
    }
}

/// "Now" on the market reference clock (fixed UTC-5), as unix seconds.
///
/// Every comparison against a slug timestamp must use this clock so that the
/// cold-start and roll-forward paths agree.
pub fn reference_timestamp(now: OffsetDateTime) -> i64 {
    (now + REFERENCE_OFFSET).unix_timestamp()
}

/// Derive the current period slug purely from the wall clock.
///
/// The reference-shifted time is floored to the interval boundary on its
/// minute component with seconds zeroed, then formatted as
/// `{asset}-updown-{interval}m-{unix_start}`.
pub fn current_slug(asset: &str, interval_minutes: i64, now: OffsetDateTime) -> String {
    let start = current_period_start(interval_minutes, now);
    format_slug(asset, interval_minutes, start)
}

/// Floor the reference-shifted clock to the containing period start.
fn current_period_start(interval_minutes: i64, now: OffsetDateTime) -> i64 {
    let shifted = now + REFERENCE_OFFSET;
    let floored_minute = (i64::from(shifted.minute()) / interval_minutes) * interval_minutes;
    shifted
        .replace_minute(floored_minute as u8)
        .expect("floored minute in range")
        .replace_second(0)
        .expect("second in range")
        .replace_nanosecond(0)
        .expect("nanosecond in range")
        .unix_timestamp()
}

fn format_slug(asset: &str, interval_minutes: i64, start: i64) -> String {
    format!("{}-updown-{}m-{}", asset.to_lowercase(), interval_minutes, start)
}

/// Steady-state tick: decide whether and where to roll.
///
/// `None` while the current period is live. On expiry, the rolled-forward
/// slug; when that one is itself already expired (the process slept across
/// one or more boundaries) the slug is re-derived from the wall clock
/// instead, so both derivation paths converge on the same identifier.
pub fn advance_slug(
    slug: &str,
    asset: &str,
    interval_minutes: i64,
    now: OffsetDateTime,
) -> Option<String> {
    let interval_seconds = interval_minutes * 60;
    let reference_now = reference_timestamp(now);
    if !should_roll(slug, interval_seconds, reference_now) {
        return None;
    }
    let rolled = next_slug(slug, interval_seconds);
    match extract_period_start(&rolled) {
        Some(start) if time_remaining(start, interval_seconds, reference_now) > 0 => Some(rolled),
        _ => Some(current_slug(asset, interval_minutes, now)),
    }
}

/// Everything the display layer wants to know about the current period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodInfo {
    /// The period slug.
    pub slug: String,
    /// Unix timestamp when the period opened.
    pub period_start: i64,
    /// Unix timestamp when the period closes (start + interval).
    pub period_end: i64,
    /// Seconds until the period closes, floored at 0.
    pub remaining_seconds: i64,
    /// Slug of the following period.
    pub next_slug: String,
}

/// Describe the period a slug belongs to. `None` for unparseable slugs.
pub fn period_info(slug: &str, interval_seconds: i64, now: OffsetDateTime) -> Option<PeriodInfo> {
    let start = extract_period_start(slug)?;
    let reference_now = reference_timestamp(now);
    Some(PeriodInfo {
        slug: slug.to_string(),
        period_start: start,
        period_end: start + interval_seconds,
        remaining_seconds: time_remaining(start, interval_seconds, reference_now),
        next_slug: next_slug(slug, interval_seconds),
    })
}

/// Format remaining seconds as "Xm Ys", or "CLOSED" once the period is over.
pub fn format_remaining(remaining_seconds: i64) -> String {
    if remaining_seconds <= 0 {
        "CLOSED".to_string()
    } else {
        format!("{}m {}s", remaining_seconds / 60, remaining_seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).expect("valid timestamp")
    }

    #[test]
    fn extract_period_start_reads_trailing_timestamp() {
        assert_eq!(
            extract_period_start("btc-updown-5m-1770999900"),
            Some(1770999900)
        );
        assert_eq!(extract_period_start("malformed"), None);
        assert_eq!(extract_period_start("btc-updown-5m-17x9"), None);
    }

    #[test]
    fn next_slug_increments_the_timestamp_only() {
        assert_eq!(
            next_slug("btc-updown-5m-1770999900", 300),
            "btc-updown-5m-1771000200"
        );
        assert_eq!(
            next_slug("eth-updown-15m-1765301400", 900),
            "eth-updown-15m-1765302300"
        );
    }

    #[test]
    fn next_slug_leaves_malformed_slugs_alone() {
        assert_eq!(next_slug("malformed", 300), "malformed");
        assert_eq!(next_slug("btc-updown-5m-", 300), "btc-updown-5m-");
    }

    #[test]
    fn time_remaining_is_floored_at_zero() {
        let start = 1770999900;
        assert_eq!(time_remaining(start, 300, start), 300);
        assert_eq!(time_remaining(start, 300, start + 299), 1);
        assert_eq!(time_remaining(start, 300, start + 300), 0);
        assert_eq!(time_remaining(start, 300, start + 301), 0);
    }

    #[test]
    fn should_roll_boundary_sits_at_the_margin() {
        let slug = "btc-updown-5m-1770999900";
        let start = 1770999900;
        // remaining == 6
        assert!(!should_roll(slug, 300, start + 294));
        // remaining == 5
        assert!(should_roll(slug, 300, start + 295));
        // long past the end
        assert!(should_roll(slug, 300, start + 1000));
    }

    #[test]
    fn should_roll_never_fires_for_malformed_slugs() {
        assert!(!should_roll("malformed", 300, i64::MAX / 2));
    }

    #[test]
    fn current_slug_floors_the_reference_clock() {
        // 1771000000 UTC is 11:26:40 on the UTC-5 reference clock's shifted
        // instant; flooring to the 5-minute boundary lands on 1770981900.
        let slug = current_slug("btc", 5, at(1771000000));
        assert_eq!(slug, "btc-updown-5m-1770981900");
        assert_eq!(
            extract_period_start(&slug),
            Some((1771000000 - 5 * 3600) / 300 * 300)
        );
    }

    #[test]
    fn current_slug_lowercases_the_asset() {
        let slug = current_slug("BTC", 5, at(1771000000));
        assert!(slug.starts_with("btc-updown-5m-"));
    }

    #[test]
    fn generator_and_roll_forward_agree_once_converged() {
        for now in [1771000000, 1771000123, 1771013702] {
            let from_clock = current_slug("btc", 5, at(now));
            let rolled = next_slug(&current_slug("btc", 5, at(now - 300)), 300);
            assert_eq!(rolled, from_clock, "divergence at now={now}");
        }
    }

    #[test]
    fn reference_timestamp_stays_inside_the_generated_period() {
        let now = at(1771000000);
        let start = extract_period_start(&current_slug("btc", 5, now)).unwrap();
        let reference_now = reference_timestamp(now);
        assert!(reference_now >= start);
        assert!(reference_now < start + 300);
    }

    #[test]
    fn advance_slug_holds_while_period_is_live() {
        let now = at(1771000000);
        let slug = current_slug("btc", 5, now);
        assert_eq!(advance_slug(&slug, "btc", 5, now), None);
    }

    #[test]
    fn advance_slug_rolls_forward_at_the_margin() {
        let slug = current_slug("btc", 5, at(1771000000));
        // 4 seconds of the period left on the reference clock.
        let near_end = at(1771000196);
        assert_eq!(
            advance_slug(&slug, "btc", 5, near_end),
            Some("btc-updown-5m-1770982200".to_string())
        );
    }

    #[test]
    fn advance_slug_rederives_after_sleeping_past_boundaries() {
        let now = at(1771000000);
        let stale = "btc-updown-5m-1770000000";
        assert_eq!(
            advance_slug(stale, "btc", 5, now),
            Some(current_slug("btc", 5, now))
        );
    }

    #[test]
    fn advance_slug_ignores_malformed_slugs() {
        assert_eq!(advance_slug("malformed", "btc", 5, at(1771000000)), None);
    }

    #[test]
    fn period_info_reports_the_window() {
        let now = at(1771000000);
        let info = period_info("btc-updown-5m-1770981900", 300, now).unwrap();
        assert_eq!(info.period_start, 1770981900);
        assert_eq!(info.period_end, 1770982200);
        // reference now is 1770982000, 200 seconds before the close.
        assert_eq!(info.remaining_seconds, 200);
        assert_eq!(info.next_slug, "btc-updown-5m-1770982200");
        assert_eq!(period_info("malformed", 300, now), None);
    }

    #[test]
    fn format_remaining_renders_minutes_and_seconds() {
        assert_eq!(format_remaining(300), "5m 0s");
        assert_eq!(format_remaining(61), "1m 1s");
        assert_eq!(format_remaining(0), "CLOSED");
        assert_eq!(format_remaining(-3), "CLOSED");
    }
}
