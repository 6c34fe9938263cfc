//! Article extraction: fetch one page, normalize its JSON-LD metadata, and
//! compute the body-derived fields.
//!
//! Extraction is split in two so the interesting part stays pure: the network
//! half ([`fetch_article`]) only retrieves bytes, and [`parse_article`] turns
//! a body into an [`ArticleRecord`] with no side effects.
//!
//! # Skip vs. drop
//!
//! A failed fetch is a *skip* and a present-but-malformed metadata block is a
//! *drop*; both yield `None`, but a page with no metadata block at all still
//! produces a record with every metadata field defaulted. Partial records are
//! never emitted.

use crate::fetch::Fetch;
use crate::models::ArticleRecord;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument, warn};

static METADATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Fetch one article page and extract its record.
///
/// Returns `None` for transport failures, non-success statuses, and articles
/// whose metadata block is present but malformed. Never errors; every failure
/// is a logged skip.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_article<F: Fetch>(fetcher: &F, url: &str) -> Option<ArticleRecord> {
    info!(%url, "Scraping article");
    let response = match fetcher.get(url).await {
        Ok(response) => response,
        Err(e) => {
            error!(%url, error = %e, "Failed to fetch article");
            return None;
        }
    };
    if !response.is_success() {
        warn!(%url, status = response.status, "Failed to fetch article");
        return None;
    }
    parse_article(url, &response.text())
}

/// Parse a fetched page into an [`ArticleRecord`].
///
/// Pure given the body. The first `script[type="application/ld+json"]`
/// element is the metadata block; its absence means every metadata field
/// defaults, while unparseable JSON rejects the article entirely.
pub fn parse_article(url: &str, body: &str) -> Option<ArticleRecord> {
    let document = Html::parse_document(body);

    let full_text = document
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let metadata = match document.select(&METADATA_SELECTOR).next() {
        None => {
            debug!(%url, "No JSON-LD block on page; using defaults");
            serde_json::Value::Object(Default::default())
        }
        Some(script) => {
            let raw = script.text().collect::<String>();
            match serde_json::from_str(&raw) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(
                        %url,
                        error = %e,
                        metadata_preview = %truncate_for_log(&raw, 200),
                        "Malformed JSON-LD metadata; dropping article"
                    );
                    return None;
                }
            }
        }
    };

    Some(ArticleRecord::from_metadata(url, &metadata, full_text))
}
