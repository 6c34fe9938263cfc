//! Command-line interface definitions for the sitemap scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Defaults target Al Mayadeen's public sitemap index; any site exposing a
//! `sitemap-{year}-{month}.xml` naming convention works.

use clap::Parser;

/// Command-line arguments for the sitemap scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape with the defaults (10000-article cap)
/// sitemap_scraper
///
/// # A small bounded run into a scratch directory
/// sitemap_scraper -o /tmp/articles -a 50
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// URL of the root sitemap index to crawl
    #[arg(
        short,
        long,
        default_value = "https://www.almayadeen.net/sitemaps/all.xml"
    )]
    pub sitemap_url: String,

    /// Output directory for the period JSON batches
    #[arg(short, long, default_value = "scraped_articles")]
    pub output_dir: String,

    /// Maximum total number of articles to scrape across the whole run
    #[arg(short, long, default_value_t = 10000)]
    pub article_limit: usize,
}
