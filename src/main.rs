//! # Sitemap Scraper
//!
//! A news-site scraping pipeline that walks a sitemap index, collects article
//! URLs period by period, extracts each article's JSON-LD metadata and body
//! text, and writes one JSON batch per (year, month) period.
//!
//! ## Usage
//!
//! ```sh
//! sitemap_scraper -s https://www.almayadeen.net/sitemaps/all.xml -o ./scraped_articles -a 10000
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Index resolution**: Fetch the root sitemap index and list the monthly sitemaps
//! 2. **Collection**: Per monthly sitemap, derive its (year, month) period and list article URLs
//! 3. **Scraping**: Fetch and normalize articles through a pool of 5 concurrent workers,
//!    subject to a global article cap shared across periods
//! 4. **Output**: Write each period's batch to `articles_{year}_{month:02}.json`
//!
//! Periods are processed sequentially; only the workers within one period
//! overlap. Individual fetch or parse failures are logged and skipped, never
//! fatal. The run ends cleanly when the cap is reached, the sitemaps are
//! exhausted, or the index itself cannot be fetched.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod extract;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod sitemap;
mod utils;

use cli::Cli;
use fetch::HttpFetcher;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("sitemap_scraper starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.sitemap_url, ?args.output_dir, args.article_limit, "Parsed CLI arguments");

    // Early check: ensure the output dir is writable before any network work
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    info!(path = %args.output_dir, "Output directory ready");

    let fetcher = HttpFetcher::new();
    let total = pipeline::process_sitemaps(
        &fetcher,
        &args.sitemap_url,
        &args.output_dir,
        args.article_limit,
    )
    .await;

    let elapsed = start_time.elapsed();
    info!(
        total_articles = total,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
