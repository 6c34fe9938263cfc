//! The scraping pipeline: sequential over periods, bounded-parallel within one.
//!
//! [`process_sitemaps`] drives the whole run: resolve the sitemap index, then
//! for each monthly sitemap derive its period, collect its article URLs, fan
//! out over [`scrape_period`], and write the finished batch.
//!
//! # Concurrency model
//!
//! Within a period, article fetches run through `buffer_unordered` with at
//! most [`POOL_SIZE`] in flight; results land in the batch in completion
//! order, not dispatch order. Periods never overlap. The only state shared
//! between workers is the global scrape counter, an `AtomicUsize` claimed
//! with a single check-and-increment per produced record, so the final count
//! is exact under any interleaving.
//!
//! # The global limit
//!
//! Reaching the limit is a cooperative stop: workers that haven't started
//! fetching bail out early, results completing after the last slot was
//! claimed are discarded, and no further periods are dispatched. Counted
//! output never exceeds the limit.

use crate::extract;
use crate::fetch::Fetch;
use crate::models::{ArticleRecord, PeriodToken};
use crate::outputs::json;
use crate::sitemap;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// Fixed number of in-flight article fetches per period.
pub const POOL_SIZE: usize = 5;

/// Run the full pipeline and return the total number of articles scraped.
///
/// The run ends cleanly in all cases: limit reached, sitemaps exhausted, or
/// an index fetch that yields nothing to process. Per-period write failures
/// are logged and do not abort later periods.
#[instrument(level = "info", skip(fetcher))]
pub async fn process_sitemaps<F: Fetch>(
    fetcher: &F,
    index_url: &str,
    output_dir: &str,
    article_limit: usize,
) -> usize {
    let sitemaps = sitemap::fetch_sitemaps(fetcher, index_url).await;
    if sitemaps.is_empty() {
        warn!("No sitemaps found, exiting");
        return 0;
    }

    let scraped = AtomicUsize::new(0);
    for sitemap_url in sitemaps {
        if scraped.load(Ordering::SeqCst) >= article_limit {
            info!(limit = article_limit, "Article limit reached; stopping");
            break;
        }

        let Some(period) = PeriodToken::from_sitemap_url(&sitemap_url) else {
            warn!(
                url = %sitemap_url,
                "Sitemap URL does not follow the period naming convention; skipping"
            );
            continue;
        };
        info!(%period, "Processing articles");

        let article_urls = sitemap::fetch_article_urls(fetcher, &sitemap_url).await;
        if article_urls.is_empty() {
            continue;
        }

        let batch = scrape_period(fetcher, &article_urls, &scraped, article_limit).await;
        if batch.is_empty() {
            continue;
        }

        if let Err(e) = json::write_period_batch(&batch, &period, output_dir).await {
            error!(%period, error = %e, "Failed to write period batch");
        } else {
            info!(
                total = scraped.load(Ordering::SeqCst),
                "Total articles scraped so far"
            );
        }
    }

    scraped.load(Ordering::SeqCst)
}

/// Scrape one period's article URLs through the bounded worker pool.
///
/// Every URL is dispatched; the returned batch holds successful records in
/// completion order. Each success claims one slot on `scraped` before it is
/// appended, so the batch never pushes the global count past `limit`; results
/// finishing after the last slot was claimed are discarded.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn scrape_period<F: Fetch>(
    fetcher: &F,
    urls: &[String],
    scraped: &AtomicUsize,
    limit: usize,
) -> Vec<ArticleRecord> {
    let mut results = stream::iter(urls)
        .map(|url| {
            let work = async move {
                if scraped.load(Ordering::SeqCst) >= limit {
                    debug!(%url, "Article limit reached; not dispatching");
                    return None;
                }
                extract::fetch_article(fetcher, url).await
            };
            // A panicking worker is converted to a skip; it must not take
            // down the pool or its siblings.
            AssertUnwindSafe(work).catch_unwind()
        })
        .buffer_unordered(POOL_SIZE);

    let mut batch = Vec::new();
    while let Some(outcome) = results.next().await {
        let record = match outcome {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(_) => {
                warn!("Worker panicked while scraping an article; skipping");
                continue;
            }
        };
        if claim_slot(scraped, limit) {
            batch.push(record);
        } else {
            debug!(url = %record.url, "Article limit reached; discarding completed result");
        }
    }

    info!(count = batch.len(), "Period scrape complete");
    batch
}

/// Check-and-increment as one atomic step. Returns false once `limit` slots
/// have been claimed; never over-counts under concurrent callers.
fn claim_slot(scraped: &AtomicUsize, limit: usize) -> bool {
    scraped
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n < limit).then_some(n + 1)
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResponse;
    use std::error::Error;

    const ARTICLE_PAGE: &str = r#"<html><head>
<script type="application/ld+json">{"headline": "Story", "@type": "NewsArticle"}</script>
</head><body><p>Some body text here.</p></body></html>"#;

    /// Serves a canned article page for every URL, failing those whose path
    /// contains "bad" and panicking on those containing "boom".
    struct ScriptedFetcher;

    impl Fetch for ScriptedFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse, Box<dyn Error>> {
            if url.contains("boom") {
                panic!("scripted worker fault");
            }
            if url.contains("bad") {
                return Err("connection reset".into());
            }
            Ok(FetchResponse {
                status: 200,
                body: ARTICLE_PAGE.as_bytes().to_vec(),
            })
        }
    }

    fn urls(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("https://example.net/{prefix}/{i}")).collect()
    }

    #[test]
    fn test_claim_slot_is_exact() {
        let scraped = AtomicUsize::new(0);
        let claimed = (0..100).filter(|_| claim_slot(&scraped, 37)).count();
        assert_eq!(claimed, 37);
        assert_eq!(scraped.load(Ordering::SeqCst), 37);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_counter_has_no_lost_or_duplicate_increments() {
        use std::sync::Arc;
        let scraped = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let scraped = Arc::clone(&scraped);
            handles.push(tokio::spawn(async move {
                (0..1000).filter(|_| claim_slot(&scraped, usize::MAX)).count()
            }));
        }
        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 8000);
        assert_eq!(scraped.load(Ordering::SeqCst), 8000);
    }

    #[tokio::test]
    async fn test_scrape_period_collects_all_under_limit() {
        let scraped = AtomicUsize::new(0);
        let batch = scrape_period(&ScriptedFetcher, &urls(8, "ok"), &scraped, 100).await;
        assert_eq!(batch.len(), 8);
        assert_eq!(scraped.load(Ordering::SeqCst), 8);
        assert!(batch.iter().all(|r| r.title == "Story"));
    }

    #[tokio::test]
    async fn test_scrape_period_enforces_limit() {
        let scraped = AtomicUsize::new(0);
        let batch = scrape_period(&ScriptedFetcher, &urls(20, "ok"), &scraped, 4).await;
        assert_eq!(batch.len(), 4);
        assert_eq!(scraped.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_limit_carries_across_periods() {
        let scraped = AtomicUsize::new(0);
        let first = scrape_period(&ScriptedFetcher, &urls(3, "ok"), &scraped, 5).await;
        assert_eq!(first.len(), 3);
        let second = scrape_period(&ScriptedFetcher, &urls(10, "ok"), &scraped, 5).await;
        assert_eq!(second.len(), 2);
        assert_eq!(scraped.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_exhausted_limit_dispatches_nothing() {
        let scraped = AtomicUsize::new(5);
        let batch = scrape_period(&ScriptedFetcher, &urls(10, "ok"), &scraped, 5).await;
        assert!(batch.is_empty());
        assert_eq!(scraped.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failed_fetches_contribute_zero_records() {
        let scraped = AtomicUsize::new(0);
        let mut mixed = urls(4, "ok");
        mixed.extend(urls(3, "bad"));
        let batch = scrape_period(&ScriptedFetcher, &mixed, &scraped, 100).await;
        assert_eq!(batch.len(), 4);
        assert_eq!(scraped.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_worker_panic_does_not_kill_the_pool() {
        let scraped = AtomicUsize::new(0);
        let mut mixed = urls(3, "ok");
        mixed.push("https://example.net/boom/0".to_string());
        mixed.extend(urls(3, "ok2"));
        let batch = scrape_period(&ScriptedFetcher, &mixed, &scraped, 100).await;
        assert_eq!(batch.len(), 6);
        assert_eq!(scraped.load(Ordering::SeqCst), 6);
    }

    /// Serves a two-sitemap index, one conforming monthly sitemap and one
    /// with a malformed period token, and article pages underneath.
    struct SiteFetcher;

    const INDEX: &str = r#"<sitemapindex>
<sitemap><loc>https://example.net/sitemaps/sitemap-oops.xml</loc></sitemap>
<sitemap><loc>https://example.net/sitemaps/sitemap-2024-08.xml</loc></sitemap>
</sitemapindex>"#;

    const MONTH: &str = r#"<urlset>
<url><loc>https://example.net/ok/1</loc></url>
<url><loc>https://example.net/ok/2</loc></url>
</urlset>"#;

    impl Fetch for SiteFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse, Box<dyn Error>> {
            let body = if url.ends_with("all.xml") {
                INDEX
            } else if url.ends_with("sitemap-2024-08.xml") {
                MONTH
            } else {
                ARTICLE_PAGE
            };
            Ok(FetchResponse { status: 200, body: body.as_bytes().to_vec() })
        }
    }

    #[tokio::test]
    async fn test_process_sitemaps_skips_malformed_period_and_writes_batch() {
        let dir = std::env::temp_dir().join(format!("sitemap_scraper_pipe_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let out = dir.to_str().unwrap().to_string();

        let total =
            process_sitemaps(&SiteFetcher, "https://example.net/sitemaps/all.xml", &out, 100).await;
        assert_eq!(total, 2);

        let artifact = dir.join("articles_2024_08.json");
        let written = tokio::fs::read_to_string(&artifact).await.unwrap();
        let records: Vec<ArticleRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(records.len(), 2);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_period_with_no_successes_writes_no_artifact() {
        struct ArticlesDownFetcher;
        impl Fetch for ArticlesDownFetcher {
            async fn get(&self, url: &str) -> Result<FetchResponse, Box<dyn Error>> {
                let body = if url.ends_with("all.xml") {
                    INDEX
                } else if url.ends_with("sitemap-2024-08.xml") {
                    MONTH
                } else {
                    return Err("connection reset".into());
                };
                Ok(FetchResponse { status: 200, body: body.as_bytes().to_vec() })
            }
        }

        let dir =
            std::env::temp_dir().join(format!("sitemap_scraper_empty_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let out = dir.to_str().unwrap().to_string();

        let total =
            process_sitemaps(&ArticlesDownFetcher, "https://example.net/sitemaps/all.xml", &out, 100)
                .await;
        assert_eq!(total, 0);
        assert!(!dir.join("articles_2024_08.json").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_process_sitemaps_empty_index_is_a_clean_exit() {
        struct DownFetcher;
        impl Fetch for DownFetcher {
            async fn get(&self, _url: &str) -> Result<FetchResponse, Box<dyn Error>> {
                Ok(FetchResponse { status: 500, body: Vec::new() })
            }
        }
        let total =
            process_sitemaps(&DownFetcher, "https://example.net/sitemaps/all.xml", "/tmp", 100)
                .await;
        assert_eq!(total, 0);
    }
}
