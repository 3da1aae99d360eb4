//! HTTP page fetching.
//!
//! The scanner talks to the network through [`PageFetcher`], which keeps the
//! scheduling and extraction code independent of reqwest:
//! - [`PageFetcher`]: fetch a URL and return status, header latency and body
//! - [`HttpFetcher`]: the reqwest implementation used by the CLI
//!
//! No retries happen here. A failed fetch is reported once and the scanner
//! turns it into the `"-1"` sentinel.

use crate::error::FetchError;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// User agent sent with every search request.
pub const USER_AGENT: &str = concat!("phrase_scan/", env!("CARGO_PKG_VERSION"));

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    /// Time until the response headers arrived.
    pub elapsed: Duration,
    pub body: String,
}

/// Fetch a page's full body as text.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// [`PageFetcher`] backed by a shared reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the crate's user agent and a whole-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let res = self.client.get(url).send().await?;
        let elapsed = t0.elapsed();
        let status = res.status();

        if !status.is_success() {
            // Error pages sometimes still carry the search markup; parse anyway.
            warn!(%url, status = status.as_u16(), "Non-success status from search page");
        }

        let body = res.text().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), elapsed_ms = elapsed.as_millis() as u64, "Fetched search page");

        Ok(FetchedPage {
            status: status.as_u16(),
            elapsed,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("phrase_scan/"));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(5)).is_ok());
    }
}
