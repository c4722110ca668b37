//! BTC 5-minute Polymarket probability tracker entry point.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use polymarket_tracker::api::{create_router, display_probabilities, AppState, ProbabilityReport};
use polymarket_tracker::config::Config;
use polymarket_tracker::error::TrackerError;
use polymarket_tracker::http::HttpFetcher;
use polymarket_tracker::metrics;
use polymarket_tracker::period;
use polymarket_tracker::tracker::{collect_event_probabilities, fetch_spot_price};
use polymarket_tracker::utils::shutdown_signal;

/// BTC 5-minute Polymarket probability tracker.
#[derive(Parser, Debug)]
#[command(name = "polymarket-tracker")]
#[command(about = "Normalized probability tracker for 5-minute up/down markets on Polymarket")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Start from a specific market slug instead of the period clock.
    #[arg(long)]
    slug: Option<String>,

    /// HTTP server port for health/status/metrics.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the polling loop (default).
    Run {
        /// Start from a specific market slug instead of the period clock.
        #[arg(long)]
        slug: Option<String>,

        /// HTTP server port for health/status/metrics.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Collect one report for a slug (or the current period) and print it.
    Snapshot {
        /// Market slug; derived from the period clock when omitted.
        #[arg(long)]
        slug: Option<String>,
    },

    /// Show the current period window, countdown, and next slug.
    PeriodInfo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("polymarket_tracker=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Snapshot { slug }) => cmd_snapshot(slug).await,
        Some(Command::PeriodInfo) => cmd_period_info().await,
        Some(Command::Run { slug, port }) => cmd_run(slug, port).await,
        None => cmd_run(args.slug, args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POLYMARKET TRACKER - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Asset: {} ({}m periods)", config.asset, config.interval_minutes);
    println!("  Events URL: {}", config.gamma_events_url);
    println!("  Book URL: {}", config.clob_book_url);
    println!("  Spot URL: {}", config.spot_price_url);
    println!("  Poll Interval: {}s", config.poll_interval_seconds);
    println!(
        "  Display Source: {}",
        if config.prefer_mid_price { "mid-price" } else { "last-trade" }
    );
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!(
        "  Retries: {} (backoff {}ms, doubling)",
        config.max_retries, config.backoff_ms
    );
    match &config.market_slug {
        Some(slug) => println!("  Forced Slug: {}", slug),
        None => println!("  Forced Slug: none (period clock)"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Show the current period window, countdown, and next slug.
async fn cmd_period_info() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POLYMARKET TRACKER - PERIOD INFO");
    println!("======================================================================");

    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let now = OffsetDateTime::now_utc();
    let slug = period::current_slug(&config.asset, config.interval_minutes, now);
    let info = period::period_info(&slug, config.interval_seconds(), now)
        .expect("generated slug has a timestamp");

    println!("  Slug: {}", info.slug);
    println!("  Period: {} - {}", info.period_start, info.period_end);
    println!(
        "  Time Remaining: {}",
        period::format_remaining(info.remaining_seconds)
    );
    println!("  Next Slug: {}", info.next_slug);
    println!("======================================================================");

    Ok(())
}

/// Collect one report for a slug and print it.
async fn cmd_snapshot(slug_override: Option<String>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POLYMARKET TRACKER - ONE-SHOT SNAPSHOT");
    println!("======================================================================");

    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let slug = slug_override
        .or_else(|| config.market_slug.clone())
        .unwrap_or_else(|| {
            period::current_slug(&config.asset, config.interval_minutes, OffsetDateTime::now_utc())
        });

    println!("\nCollecting probabilities for {}...\n", slug);

    let fetcher = HttpFetcher::new(&config);

    match collect_event_probabilities(&fetcher, &config, &slug).await {
        Ok(result) => {
            let displayed = display_probabilities(&result, config.prefer_mid_price);

            println!("MARKET FOUND");
            println!("----------------------------------------------------------------------");
            println!("  Title: {}", result.title);
            println!("  Question: {}", result.question);
            if let Some(end_time) = &result.end_time {
                println!("  Ends: {}", end_time);
            }
            println!(
                "  Tokens: {} / {}",
                short_id(&result.token_ids[0]),
                short_id(&result.token_ids[1])
            );
            println!(
                "  {}: {}%",
                result.outcome_labels[0],
                (displayed[0] * Decimal::ONE_HUNDRED).round_dp(1)
            );
            println!(
                "  {}: {}%",
                result.outcome_labels[1],
                (displayed[1] * Decimal::ONE_HUNDRED).round_dp(1)
            );
            println!(
                "  Direct: {:?} / {:?}",
                result.direct.first, result.direct.second
            );
            println!("  Mid:    {:?} / {:?}", result.mid.first, result.mid.second);
            if let Some(info) =
                period::period_info(&slug, config.interval_seconds(), OffsetDateTime::now_utc())
            {
                println!(
                    "  Time Remaining: {}",
                    period::format_remaining(info.remaining_seconds)
                );
                println!("  Next Slug: {}", info.next_slug);
            }
            if let Some(price) =
                fetch_spot_price(&fetcher, &config.spot_price_url, &config.spot_asset_id).await
            {
                println!("  {} spot: ${}", config.spot_asset_id, price);
            }
            println!("======================================================================");
        }
        Err(e) => {
            println!("NO DATA");
            println!("  Error: {}", e);
            println!(
                "\nMarkets open every {} minutes. Try again shortly.",
                config.interval_minutes
            );
            println!("======================================================================");
        }
    }

    Ok(())
}

/// Run the polling loop.
async fn cmd_run(slug_override: Option<String>, port: u16) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Asset: {} ({}m periods)", config.asset, config.interval_minutes);
    info!("Poll interval: {}s", config.poll_interval_seconds);
    info!(
        "Display source: {}",
        if config.prefer_mid_price { "mid-price" } else { "last-trade" }
    );

    // Initialize metrics and app state
    let metrics_handle = metrics::init_metrics();
    let app_state = AppState::new(Some(metrics_handle));

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());

    // Spawn HTTP server
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let fetcher = HttpFetcher::new(&config);

    // Cold start: forced slug, else derive from the period clock
    let mut slug = slug_override
        .or_else(|| config.market_slug.clone())
        .unwrap_or_else(|| {
            period::current_slug(&config.asset, config.interval_minutes, OffsetDateTime::now_utc())
        });

    info!("========================================");
    info!("POLYMARKET PROBABILITY TRACKER STARTED");
    info!("========================================");
    info!("Market: {}", slug);
    info!("========================================");

    *app_state.market_slug.write().await = Some(slug.clone());

    loop {
        run_cycle(&fetcher, &config, &app_state, &slug).await;

        // Brief pause between cycles
        tokio::time::sleep(Duration::from_secs(config.poll_interval_seconds)).await;

        if let Some(next) = period::advance_slug(
            &slug,
            &config.asset,
            config.interval_minutes,
            OffsetDateTime::now_utc(),
        ) {
            info!("Period expired: {} -> {}", slug, next);
            metrics::inc_rollovers();
            slug = next;
            *app_state.market_slug.write().await = Some(slug.clone());
        }
    }
}

/// One poll cycle: collect, enrich, publish.
async fn run_cycle(fetcher: &HttpFetcher, config: &Config, app_state: &AppState, slug: &str) {
    let _cycle_timer = metrics::timer_poll_cycle();

    match collect_event_probabilities(fetcher, config, slug).await {
        Ok(result) => {
            metrics::inc_polls();

            // Display enrichment only; never blocks the cycle
            let spot_price =
                fetch_spot_price(fetcher, &config.spot_price_url, &config.spot_asset_id).await;

            let now = OffsetDateTime::now_utc();
            let period = period::period_info(slug, config.interval_seconds(), now);
            let displayed = display_probabilities(&result, config.prefer_mid_price);
            let trend = app_state.record_trend(slug, displayed);

            let remaining = period
                .as_ref()
                .map(|info| info.remaining_seconds)
                .unwrap_or(0);
            info!(
                "[{}] {}: {}% | {}: {}% [Time: {}]",
                slug,
                result.outcome_labels[0],
                (displayed[0] * Decimal::ONE_HUNDRED).round_dp(1),
                result.outcome_labels[1],
                (displayed[1] * Decimal::ONE_HUNDRED).round_dp(1),
                period::format_remaining(remaining)
            );
            if let Some(delta) = trend {
                let delta_pp = (delta * Decimal::ONE_HUNDRED).round_dp(2);
                let sign = if delta_pp.is_sign_positive() { "+" } else { "" };
                info!("Trend vs previous cycle: {}{}pp", sign, delta_pp);
            }

            // Publish only after the full cycle succeeded
            let report =
                ProbabilityReport::from_cycle(result, spot_price, period, displayed, trend, now);
            *app_state.latest.write().await = Some(report);
            app_state.set_ready(true);
        }
        Err(e) => {
            metrics::inc_poll_failures();
            let err = TrackerError::from(e);
            warn!("Poll cycle failed for {}: {}. Retrying next cycle...", slug, err);
            app_state.set_ready(false);
        }
    }
}

fn short_id(token_id: &str) -> String {
    if token_id.len() > 20 {
        format!("{}...", &token_id[..20])
    } else {
        token_id.to_string()
    }
}
