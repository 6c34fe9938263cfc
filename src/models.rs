//! Data models for scraped articles and sitemap periods.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleRecord`]: The canonical, fully-normalized representation of one article
//! - [`PeriodToken`]: The (year, month) pair a monthly sitemap covers
//! - [`ScalarOrSeq`]: Decoder for metadata fields that may be a scalar or a sequence
//!
//! JSON-LD blocks found in the wild are wildly inconsistent: fields go missing,
//! `keywords` may be a comma-joined string or an array, `image` and `author` may
//! be objects or bare strings. Every normalization decision lives here so the
//! extractor stays a thin fetch-and-parse layer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Default string for metadata fields absent from the JSON-LD block.
const UNKNOWN: &str = "unknown";

/// Matches the last path segment of a monthly sitemap URL, e.g. `sitemap-2024-08.xml`.
static PERIOD_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sitemap-(\d{4})-(\d{1,2})\.xml$").unwrap());

/// The publication period one child sitemap covers.
///
/// Derived from the sitemap URL's last path segment by stripping the
/// `sitemap-` prefix and `.xml` suffix and splitting on `-`. A URL that
/// doesn't follow this convention yields no token and the sitemap is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodToken {
    pub year: i32,
    pub month: u32,
}

impl PeriodToken {
    /// Derive the period from a sitemap URL, e.g.
    /// `https://example.net/sitemaps/sitemap-2024-08.xml` -> 2024-08.
    ///
    /// Returns `None` for URLs that don't follow the naming convention or
    /// whose month falls outside 1..=12.
    pub fn from_sitemap_url(sitemap_url: &str) -> Option<Self> {
        let parsed = Url::parse(sitemap_url).ok()?;
        let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
        let caps = PERIOD_SEGMENT.captures(segment)?;
        let year = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// File name of this period's output artifact, month zero-padded.
    pub fn artifact_name(&self) -> String {
        format!("articles_{}_{:02}.json", self.year, self.month)
    }
}

impl std::fmt::Display for PeriodToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// One fully-normalized scraped article.
///
/// Every metadata field has a default applied when the JSON-LD block omits it
/// (see [`ArticleRecord::from_metadata`]); `full_text` and `word_count` are
/// always computed from the rendered body, never defaulted.
///
/// Invariant: `word_count` equals the number of whitespace-delimited tokens
/// in `full_text`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Canonical URL from metadata, falling back to the URL that was fetched.
    pub url: String,
    /// Source-assigned identifier for the article.
    pub post_id: String,
    /// The article headline.
    pub title: String,
    /// Topic keywords; a comma-joined scalar is split into its parts.
    pub keywords: Vec<String>,
    /// URL of the lead image, taken from `image.url` when `image` is an object.
    pub thumbnail: String,
    /// Original publication timestamp as the source encodes it.
    pub publication_date: String,
    /// Last modification timestamp as the source encodes it.
    pub last_updated_date: String,
    /// Byline, taken from `author.name` when `author` is an object.
    pub author: String,
    /// The article's summary/description.
    pub description: String,
    /// Declared content language.
    pub lang: String,
    /// The JSON-LD `@type` value(s), normalized to a sequence.
    pub classes: Vec<String>,
    /// Whitespace-token count of `full_text`.
    pub word_count: usize,
    /// Newline-joined text of every paragraph in document order.
    pub full_text: String,
}

impl ArticleRecord {
    /// Build a record from a parsed JSON-LD metadata object and the extracted
    /// body text, applying one default per absent or mis-shaped field.
    ///
    /// `metadata` may be an empty object (no JSON-LD block on the page), in
    /// which case every metadata field takes its default and only the computed
    /// fields carry information.
    pub fn from_metadata(article_url: &str, metadata: &Value, full_text: String) -> Self {
        Self {
            url: string_field(metadata, "url").unwrap_or_else(|| article_url.to_string()),
            post_id: string_field(metadata, "identifier").unwrap_or_else(unknown),
            title: string_field(metadata, "headline").unwrap_or_else(unknown),
            keywords: scalar_or_seq(metadata, "keywords")
                .map(ScalarOrSeq::into_comma_split)
                .unwrap_or_default(),
            thumbnail: nested_string_field(metadata, "image", "url").unwrap_or_else(unknown),
            publication_date: string_field(metadata, "datePublished").unwrap_or_else(unknown),
            last_updated_date: string_field(metadata, "dateModified").unwrap_or_else(unknown),
            author: nested_string_field(metadata, "author", "name").unwrap_or_else(unknown),
            description: string_field(metadata, "description").unwrap_or_else(unknown),
            lang: string_field(metadata, "inLanguage").unwrap_or_else(unknown),
            classes: scalar_or_seq(metadata, "@type")
                .map(ScalarOrSeq::into_seq)
                .unwrap_or_default(),
            word_count: full_text.split_whitespace().count(),
            full_text,
        }
    }
}

/// A metadata field that sources encode as either one string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrSeq {
    Scalar(String),
    Seq(Vec<String>),
}

impl ScalarOrSeq {
    /// Normalize to a sequence, wrapping a scalar as a one-element sequence.
    pub fn into_seq(self) -> Vec<String> {
        match self {
            ScalarOrSeq::Scalar(s) => vec![s],
            ScalarOrSeq::Seq(v) => v,
        }
    }

    /// Normalize to a sequence, splitting a comma-joined scalar into its parts.
    pub fn into_comma_split(self) -> Vec<String> {
        match self {
            ScalarOrSeq::Scalar(s) => s.split(',').map(str::to_string).collect(),
            ScalarOrSeq::Seq(v) => v,
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Top-level string field, `None` when absent or not a string.
fn string_field(metadata: &Value, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}

/// String field inside a nested object, `None` when the outer value is not an
/// object (some sources encode `image`/`author` as bare strings).
fn nested_string_field(metadata: &Value, key: &str, sub: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(Value::as_object)
        .and_then(|obj| obj.get(sub))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Decode a scalar-or-sequence field, `None` when absent or neither shape fits.
fn scalar_or_seq(metadata: &Value, key: &str) -> Option<ScalarOrSeq> {
    metadata
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}
