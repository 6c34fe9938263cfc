//! HTTP retrieval behind a narrow trait seam.
//!
//! The rest of the pipeline only ever needs "give me the status and body for
//! this URL", so that capability is expressed as the [`Fetch`] trait. The
//! production implementation ([`HttpFetcher`]) rides on a shared
//! `reqwest::Client`; tests substitute in-memory implementations to drive the
//! pipeline without a network.

use std::borrow::Cow;
use std::error::Error;

/// Status and body of one completed retrieval.
#[derive(Debug)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the status is in the 2xx success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// One blocking retrieval per URL: status + body, or a transport error.
///
/// Transport errors and non-success statuses are never fatal to the pipeline;
/// every caller recovers locally by skipping the resource.
pub trait Fetch {
    async fn get(&self, url: &str) -> Result<FetchResponse, Box<dyn Error>>;
}

/// [`Fetch`] implementation over a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, Box<dyn Error>> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status, body })
    }
}
