//! Sitemap discovery: the root index and the per-period child sitemaps.
//!
//! Both the sitemap index and the monthly sitemaps list their children as
//! `<loc>` elements, so one extraction routine serves both levels. Fetch
//! failures at either level are logged and yield an empty list; an empty
//! index halts the run (there is nothing to process) while an empty child
//! sitemap is simply skipped by the caller.

use crate::fetch::Fetch;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{error, info, instrument, warn};

/// Fetch the root sitemap index and return every child sitemap URL it lists,
/// in document order. No retries; any failure yields an empty list.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_sitemaps<F: Fetch>(fetcher: &F, index_url: &str) -> Vec<String> {
    info!(url = %index_url, "Fetching sitemap index");
    let response = match fetcher.get(index_url).await {
        Ok(response) => response,
        Err(e) => {
            error!(url = %index_url, error = %e, "Failed to fetch sitemap index");
            return Vec::new();
        }
    };
    if !response.is_success() {
        error!(
            url = %index_url,
            status = response.status,
            "Failed to fetch sitemap index"
        );
        return Vec::new();
    }

    let sitemap_urls = extract_locations(&response.text());
    info!(count = sitemap_urls.len(), "Found sitemap URLs");
    sitemap_urls
}

/// Fetch one child sitemap and return every article URL it lists, in document
/// order. A failed fetch yields an empty list and the caller moves on.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_article_urls<F: Fetch>(fetcher: &F, sitemap_url: &str) -> Vec<String> {
    info!(url = %sitemap_url, "Fetching articles from sitemap");
    let response = match fetcher.get(sitemap_url).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %sitemap_url, error = %e, "Failed to fetch sitemap");
            return Vec::new();
        }
    };
    if !response.is_success() {
        warn!(
            url = %sitemap_url,
            status = response.status,
            "Failed to fetch sitemap"
        );
        return Vec::new();
    }

    let article_urls = extract_locations(&response.text());
    info!(count = article_urls.len(), "Found article URLs");
    article_urls
}

/// Pull the text of every `<loc>` element out of a sitemap document, in
/// document order. Parse errors stop extraction at the point of damage and
/// whatever was collected so far is returned.
pub fn extract_locations(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locations = Vec::new();
    let mut in_loc = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::End(e)) if e.name().local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Text(t)) if in_loc => match t.xml_content() {
                Ok(text) => locations.push(text.into_owned()),
                Err(e) => warn!(error = %e, "Skipping undecodable <loc> text"),
            },
            Ok(Event::CData(t)) if in_loc => {
                locations.push(String::from_utf8_lossy(&t).into_owned());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "Sitemap XML is malformed; stopping extraction");
                break;
            }
            _ => {}
        }
    }
    locations
}
