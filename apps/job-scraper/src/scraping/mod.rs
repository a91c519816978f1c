// Discovery and per-posting extraction.
//
// A backend pairs one ManifestResolver (which postings exist) with one
// RecordExtractor (what a posting says). Neither knows about analysis.

pub mod board_api;
pub mod extractor;
pub mod page;
pub mod paged_api;
pub mod sitemap;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::errors::ScrapeError;
use crate::models::ManifestEntry;
use crate::retry::{retry_with_backoff, RetryDecision, RetryPolicy};

/// Produces the ordered manifest of postings for one run.
#[async_trait]
pub trait ManifestResolver: Send + Sync {
    async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError>;

    /// Manifest columns exported after `url`, in order.
    fn columns(&self) -> Vec<String>;
}

pub(crate) const DISCOVERY_USER_AGENT: &str = "Mozilla/5.0 (compatible; job-scraper)";

pub(crate) fn discovery_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_store(true)
        .user_agent(DISCOVERY_USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Transient network failures and 429/5xx responses are worth another try.
pub(crate) fn classify_http(e: &reqwest::Error) -> RetryDecision {
    let retriable_status = e
        .status()
        .map(|s| s.is_server_error() || s.as_u16() == 429)
        .unwrap_or(false);
    if e.is_timeout() || e.is_connect() || e.is_body() || retriable_status {
        RetryDecision::Retry
    } else {
        RetryDecision::GiveUp
    }
}

/// GET `url` with query params and return the body, retrying per `policy`.
pub(crate) async fn get_text_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<String, reqwest::Error> {
    retry_with_backoff(policy, classify_http, |_| async {
        client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    })
    .await
}
