//! Paged JSON API discovery.
//!
//! A `PageSource` knows one vendor's endpoint and payload shape; the
//! `PagedApiResolver` owns the paging loop and its stop conditions.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::ScrapeError;
use crate::models::{parse_date_prefix, ManifestEntry};
use crate::retry::RetryPolicy;
use crate::scraping::page::{HttpPageSession, PageSession};
use crate::scraping::{get_text_with_retry, ManifestResolver};

/// Hard stop on pages fetched in one discovery, whatever the API reports.
pub const MAX_PAGES: usize = 500;

/// Keeps postings dated `start <= date < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LookbackWindow {
    /// The `days` before `today`, excluding today itself.
    pub fn ending_today(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - chrono::Duration::days(days),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// One page of postings starting at `offset`, in API order.
    async fn fetch_page(&self, offset: usize, limit: usize)
        -> Result<Vec<ManifestEntry>, ScrapeError>;

    /// Total postings the site advertises, when it advertises one.
    async fn expected_total(&self) -> Result<Option<usize>, ScrapeError> {
        Ok(None)
    }

    fn columns(&self) -> Vec<String>;
}

pub struct PagedApiResolver<P: PageSource> {
    source: P,
    page_size: usize,
    window: Option<LookbackWindow>,
    max_pages: usize,
}

impl<P: PageSource> PagedApiResolver<P> {
    pub fn new(source: P, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            window: None,
            max_pages: MAX_PAGES,
        }
    }

    /// Keep only postings inside `window`, and stop once a page reaches
    /// back past its start. Undated postings are kept.
    pub fn with_window(mut self, window: LookbackWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[async_trait]
impl<P: PageSource> ManifestResolver for PagedApiResolver<P> {
    async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError> {
        let expected = self.source.expected_total().await?;
        if let Some(total) = expected {
            info!("Expecting {total} job descriptions");
        }

        let mut manifest = Vec::new();
        let mut offset = 0;
        let mut seen = 0;
        let mut pages = 0;

        loop {
            if expected.is_some_and(|total| seen >= total) {
                break;
            }
            if pages >= self.max_pages {
                warn!("Stopped paging after {pages} pages");
                break;
            }

            info!("Scraping jobs {offset}-{}...", offset + self.page_size);
            let page = self.source.fetch_page(offset, self.page_size).await?;
            pages += 1;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            seen += page_len;

            let oldest = page.iter().filter_map(|e| e.last_modified).min();
            match self.window {
                Some(window) => manifest.extend(
                    page.into_iter()
                        .filter(|e| e.last_modified.map_or(true, |d| window.contains(d))),
                ),
                None => manifest.extend(page),
            }

            if let (Some(window), Some(oldest)) = (self.window, oldest) {
                if oldest < window.start {
                    break;
                }
            }
            offset += page_len;
        }

        Ok(manifest)
    }

    fn columns(&self) -> Vec<String> {
        self.source.columns()
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses a counter such as "821 Open Jobs" or "1,204 Open Jobs".
pub fn parse_job_counter(text: &str) -> Option<usize> {
    text.split_whitespace()
        .next()?
        .replace(',', "")
        .parse()
        .ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Requisition list API (offset/limit, advertised total)
// ────────────────────────────────────────────────────────────────────────────

pub const REQUISITION_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct RequisitionResponse {
    #[serde(default)]
    items: Vec<RequisitionItem>,
}

#[derive(Debug, Deserialize)]
struct RequisitionItem {
    #[serde(rename = "requisitionList", default)]
    requisition_list: Vec<Requisition>,
}

#[derive(Debug, Deserialize)]
struct Requisition {
    #[serde(rename = "Id")]
    id: Value,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "PrimaryLocation", default)]
    primary_location: Option<String>,
    #[serde(rename = "PostedDate", default)]
    posted_date: Option<String>,
    #[serde(rename = "ShortDescriptionStr", default)]
    short_description: Option<String>,
}

/// Parses one requisition page into manifest entries.
pub fn parse_requisition_page(
    body: &str,
    posting_base: &str,
) -> Result<Vec<ManifestEntry>, serde_json::Error> {
    let response: RequisitionResponse = serde_json::from_str(body)?;
    let Some(first) = response.items.into_iter().next() else {
        return Ok(Vec::new());
    };
    Ok(first
        .requisition_list
        .into_iter()
        .map(|req| {
            let id = value_to_string(&req.id);
            let posted = req.posted_date.unwrap_or_default();
            ManifestEntry::new(format!("{}/{id}", posting_base.trim_end_matches('/')))
                .with_last_modified(parse_date_prefix(&posted))
                .with_field("id", id)
                .with_field("title", req.title.unwrap_or_default())
                .with_field("primary_location", req.primary_location.unwrap_or_default())
                .with_field("posted_date", posted)
                .with_field("short_description", req.short_description.unwrap_or_default())
        })
        .collect())
}

pub struct RequisitionListSource {
    backend: String,
    endpoint: String,
    posting_base: String,
    landing_page: String,
    counter_selector: String,
    client: Client,
    retry: RetryPolicy,
}

impl RequisitionListSource {
    pub fn new(
        backend: impl Into<String>,
        endpoint: impl Into<String>,
        posting_base: impl Into<String>,
        landing_page: impl Into<String>,
        counter_selector: impl Into<String>,
        client: Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend: backend.into(),
            endpoint: endpoint.into(),
            posting_base: posting_base.into(),
            landing_page: landing_page.into(),
            counter_selector: counter_selector.into(),
            client,
            retry,
        }
    }
}

#[async_trait]
impl PageSource for RequisitionListSource {
    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ManifestEntry>, ScrapeError> {
        let finder = format!("findReqs;limit={limit},sortBy=POSTING_DATES_DESC,offset={offset}");
        let query = [("onlyData", "true".to_string()), ("finder", finder)];
        let body = get_text_with_retry(&self.client, &self.endpoint, &query, &self.retry)
            .await
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        parse_requisition_page(&body, &self.posting_base)
            .map_err(|e| ScrapeError::discovery(&self.backend, format!("bad page payload: {e}")))
    }

    async fn expected_total(&self) -> Result<Option<usize>, ScrapeError> {
        let mut session = HttpPageSession::new(Duration::from_secs(10))
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        session
            .navigate(&self.landing_page)
            .await
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        let counter = session
            .locate_all(&self.counter_selector)
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        let text = counter.first().map(|el| el.read_text().trim().to_string());
        match text.as_deref().and_then(parse_job_counter) {
            Some(total) => Ok(Some(total)),
            None => Err(ScrapeError::discovery(
                &self.backend,
                format!("no job counter on {}", self.landing_page),
            )),
        }
    }

    fn columns(&self) -> Vec<String> {
        ["id", "title", "primary_location", "posted_date", "short_description"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Positions API (start/num, newest first, date window)
// ────────────────────────────────────────────────────────────────────────────

pub const POSITIONS_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    positions: Vec<Position>,
}

#[derive(Debug, Deserialize)]
struct Position {
    job_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    /// Creation time, unix seconds.
    t_create: Option<i64>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    business_unit: Option<String>,
    #[serde(default)]
    work_location: Option<String>,
    #[serde(rename = "isPrivate", default)]
    is_private: Option<bool>,
    #[serde(rename = "Url", alias = "canonicalPositionUrl")]
    url: String,
}

/// Parses one positions page into manifest entries.
pub fn parse_positions_page(body: &str) -> Result<Vec<ManifestEntry>, serde_json::Error> {
    let response: PositionsResponse = serde_json::from_str(body)?;
    Ok(response
        .positions
        .into_iter()
        .map(|pos| {
            let created = pos
                .t_create
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.date_naive());
            ManifestEntry::new(pos.url)
                .with_last_modified(created)
                .with_field("id", value_to_string(&pos.job_id))
                .with_field("title", pos.name.unwrap_or_default())
                .with_field("primary_location", pos.location.unwrap_or_default())
                .with_field(
                    "posted_date",
                    created
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                )
                .with_field("department", pos.department.unwrap_or_default())
                .with_field("business_unit", pos.business_unit.unwrap_or_default())
                .with_field("work_location_option", pos.work_location.unwrap_or_default())
                .with_field(
                    "is_private",
                    pos.is_private.map(|p| p.to_string()).unwrap_or_default(),
                )
        })
        .collect())
}

pub struct PositionsSource {
    backend: String,
    endpoint: String,
    /// Fixed query parameters (domain, query, pid...) sent with every page.
    params: Vec<(&'static str, &'static str)>,
    client: Client,
    retry: RetryPolicy,
}

impl PositionsSource {
    pub fn new(
        backend: impl Into<String>,
        endpoint: impl Into<String>,
        params: &[(&'static str, &'static str)],
        client: Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend: backend.into(),
            endpoint: endpoint.into(),
            params: params.to_vec(),
            client,
            retry,
        }
    }
}

#[async_trait]
impl PageSource for PositionsSource {
    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ManifestEntry>, ScrapeError> {
        let mut query: Vec<(&str, String)> = self
            .params
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        query.push(("start", offset.to_string()));
        query.push(("num", limit.to_string()));
        query.push(("sort_by", "t_create".to_string()));
        let body = get_text_with_retry(&self.client, &self.endpoint, &query, &self.retry)
            .await
            .map_err(|e| ScrapeError::discovery(&self.backend, e.to_string()))?;
        parse_positions_page(&body)
            .map_err(|e| ScrapeError::discovery(&self.backend, format!("bad page payload: {e}")))
    }

    fn columns(&self) -> Vec<String> {
        [
            "id",
            "title",
            "primary_location",
            "posted_date",
            "department",
            "business_unit",
            "work_location_option",
            "is_private",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
