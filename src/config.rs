//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Upstream Endpoints ===
    /// Gamma events-by-slug endpoint.
    #[serde(default = "default_gamma_events_url")]
    pub gamma_events_url: String,

    /// CLOB order-book-by-token endpoint.
    #[serde(default = "default_clob_book_url")]
    pub clob_book_url: String,

    /// Spot price endpoint (display enrichment only).
    #[serde(default = "default_spot_price_url")]
    pub spot_price_url: String,

    /// Reference asset id on the spot price endpoint.
    #[serde(default = "default_spot_asset_id")]
    pub spot_asset_id: String,

    // === Market Selection ===
    /// Asset prefix used in generated slugs.
    #[serde(default = "default_asset")]
    pub asset: String,

    /// Market period length in minutes.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: i64,

    /// Force a specific starting slug (bypasses the period clock cold start).
    #[serde(default)]
    pub market_slug: Option<String>,

    // === Polling ===
    /// Seconds between refresh cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Prefer mid-price probabilities for display; direct otherwise.
    #[serde(default = "default_true")]
    pub prefer_mid_price: bool,

    // === HTTP ===
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Connection pool size per host.
    #[serde(default = "default_http_pool_size")]
    pub http_pool_size: usize,

    /// Additional attempts after a failed request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff in milliseconds; doubles per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_gamma_events_url() -> String {
    "https://gamma-api.polymarket.com/events".to_string()
}

fn default_clob_book_url() -> String {
    "https://clob.polymarket.com/book".to_string()
}

fn default_spot_price_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".to_string()
}

fn default_spot_asset_id() -> String {
    "bitcoin".to_string()
}

fn default_asset() -> String {
    "btc".to_string()
}

fn default_interval_minutes() -> i64 {
    5
}

fn default_poll_interval() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_http_pool_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1_000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gamma_events_url: default_gamma_events_url(),
            clob_book_url: default_clob_book_url(),
            spot_price_url: default_spot_price_url(),
            spot_asset_id: default_spot_asset_id(),
            asset: default_asset(),
            interval_minutes: default_interval_minutes(),
            market_slug: None,
            poll_interval_seconds: default_poll_interval(),
            prefer_mid_price: default_true(),
            http_timeout_ms: default_http_timeout_ms(),
            http_pool_size: default_http_pool_size(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Market period length in seconds.
    pub fn interval_seconds(&self) -> i64 {
        self.interval_minutes * 60
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.asset.is_empty() {
            return Err("ASSET must not be empty".to_string());
        }

        // Periods must tile the hour so the minute-floor generator stays
        // contiguous and non-overlapping.
        if !(1..=60).contains(&self.interval_minutes) || 60 % self.interval_minutes != 0 {
            return Err("INTERVAL_MINUTES must divide 60".to_string());
        }

        if self.poll_interval_seconds == 0 {
            return Err("POLL_INTERVAL_SECONDS must be at least 1".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::default();
        assert_eq!(config.interval_minutes, 5);
        assert_eq!(config.poll_interval_seconds, 3);
        assert_eq!(config.asset, "btc");
        assert!(config.prefer_mid_price);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_asset() {
        let config = Config {
            asset: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_intervals_that_do_not_tile_the_hour() {
        for interval_minutes in [0, 7, 61] {
            let config = Config {
                interval_minutes,
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{interval_minutes} accepted");
        }
        let config = Config {
            interval_minutes: 15,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = Config {
            poll_interval_seconds: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn interval_seconds_converts_minutes() {
        assert_eq!(Config::default().interval_seconds(), 300);
    }
}
