//! Hosted job-board discovery (Greenhouse boards API): one request, all jobs.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::errors::ScrapeError;
use crate::models::ManifestEntry;
use crate::retry::RetryPolicy;
use crate::scraping::{get_text_with_retry, ManifestResolver};

pub const BOARD_COLUMNS: &[&str] = &["location", "requisition_id", "title", "published"];

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    absolute_url: Option<String>,
    #[serde(default)]
    location: Option<BoardLocation>,
    #[serde(default)]
    requisition_id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    first_published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoardLocation {
    name: Option<String>,
}

/// Parses a `/jobs` listing. Jobs without a URL cannot be scraped and are
/// dropped.
pub fn parse_board(body: &str) -> Result<Vec<ManifestEntry>, serde_json::Error> {
    let response: BoardResponse = serde_json::from_str(body)?;
    Ok(response
        .jobs
        .into_iter()
        .filter_map(|job| {
            let url = job.absolute_url?;
            let mut entry = ManifestEntry::new(url);
            if let Some(name) = job.location.and_then(|l| l.name) {
                entry = entry.with_field("location", name);
            }
            match job.requisition_id {
                Some(Value::String(id)) => entry = entry.with_field("requisition_id", id),
                Some(Value::Null) | None => {}
                Some(other) => entry = entry.with_field("requisition_id", other.to_string()),
            }
            if let Some(title) = job.title {
                entry = entry.with_field("title", title);
            }
            if let Some(published) = job.first_published {
                entry = entry.with_field("published", published);
            }
            Some(entry)
        })
        .collect())
}

pub struct BoardApiResolver {
    backend: String,
    board_base: String,
    client: Client,
    retry: RetryPolicy,
}

impl BoardApiResolver {
    pub fn new(
        backend: impl Into<String>,
        board_base: impl Into<String>,
        client: Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend: backend.into(),
            board_base: board_base.into(),
            client,
            retry,
        }
    }
}

#[async_trait]
impl ManifestResolver for BoardApiResolver {
    async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError> {
        let url = format!("{}/jobs", self.board_base.trim_end_matches('/'));
        info!("Listing jobs from {url}");
        let body = get_text_with_retry(&self.client, &url, &[], &self.retry)
            .await
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        parse_board(&body)
            .map_err(|e| ScrapeError::discovery(&self.backend, format!("bad board payload: {e}")))
    }

    fn columns(&self) -> Vec<String> {
        BOARD_COLUMNS.iter().map(|c| c.to_string()).collect()
    }
}
