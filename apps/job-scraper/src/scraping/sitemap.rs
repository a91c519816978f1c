//! Sitemap discovery: fetch, walk nested indexes, filter job URLs.

use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::escape::resolve_predefined_entity;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use async_trait::async_trait;

use crate::errors::ScrapeError;
use crate::models::{parse_date_prefix, ManifestEntry};
use crate::retry::RetryPolicy;
use crate::scraping::{get_text_with_retry, ManifestResolver};

pub const SITE_MAP_PATH: &str = "sitemap.xml";

/// Nested sitemap indexes deeper than this are not followed.
const MAX_INDEX_DEPTH: usize = 3;

/// Manifest field holding the posting id captured by `id_pattern`.
pub const REQ_ID_FIELD: &str = "req_id";

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    Index(Vec<String>),
    UrlSet(Vec<SitemapUrl>),
}

/// Parses a `<urlset>` or `<sitemapindex>` document, ignoring namespaces.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut is_index = false;
    let mut children: Vec<String> = Vec::new();
    let mut urls: Vec<SitemapUrl> = Vec::new();

    let mut current_loc: Option<String> = None;
    let mut current_lastmod: Option<String> = None;
    // Text target: Some("loc") or Some("lastmod") while inside those tags.
    let mut capture: Option<&'static str> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"url" | b"sitemap" => {
                    current_loc = None;
                    current_lastmod = None;
                }
                b"loc" => {
                    capture = Some("loc");
                    buffer.clear();
                }
                b"lastmod" => {
                    capture = Some("lastmod");
                    buffer.clear();
                }
                _ => {}
            },
            Event::Text(e) if capture.is_some() => {
                buffer.push_str(&e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) if capture.is_some() => {
                buffer.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) if capture.is_some() => {
                if let Some(ch) = e.resolve_char_ref()? {
                    buffer.push(ch);
                } else {
                    let name = e.decode().map_err(quick_xml::Error::from)?;
                    match resolve_predefined_entity(&name) {
                        Some(resolved) => buffer.push_str(resolved),
                        None => {
                            buffer.push('&');
                            buffer.push_str(&name);
                            buffer.push(';');
                        }
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" => {
                    current_loc = Some(buffer.trim().to_string());
                    capture = None;
                }
                b"lastmod" => {
                    current_lastmod = Some(buffer.trim().to_string());
                    capture = None;
                }
                b"sitemap" => {
                    if let Some(loc) = current_loc.take() {
                        children.push(loc);
                    }
                }
                b"url" => {
                    if let Some(loc) = current_loc.take() {
                        urls.push(SitemapUrl {
                            loc,
                            lastmod: current_lastmod.take().as_deref().and_then(parse_date_prefix),
                        });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(if is_index {
        SitemapDocument::Index(children)
    } else {
        SitemapDocument::UrlSet(urls)
    })
}

/// The site-root `sitemap.xml` for a homepage, or the URL itself when it
/// already names an XML document.
pub fn sitemap_location(domain: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(domain)?;
    if parsed.path().ends_with(".xml") {
        return Ok(parsed.to_string());
    }
    Ok(parsed.join(&format!("/{SITE_MAP_PATH}"))?.to_string())
}

pub struct SitemapResolver {
    backend: String,
    sitemap_url: String,
    job_pattern: Regex,
    id_pattern: Option<Regex>,
    url_rewrite: Option<(&'static str, &'static str)>,
    limit: Option<usize>,
    client: Client,
    retry: RetryPolicy,
}

impl SitemapResolver {
    pub fn new(
        backend: impl Into<String>,
        domain: &str,
        job_pattern: Regex,
        id_pattern: Option<Regex>,
        client: Client,
        retry: RetryPolicy,
    ) -> Result<Self, ScrapeError> {
        let sitemap_url = sitemap_location(domain)
            .map_err(|e| ScrapeError::Config(format!("bad sitemap domain '{domain}': {e}")))?;
        Ok(Self {
            backend: backend.into(),
            sitemap_url,
            job_pattern,
            id_pattern,
            url_rewrite: None,
            limit: None,
            client,
            retry,
        })
    }

    /// Rewrites every discovered URL, replacing `from` with `to`.
    pub fn with_url_rewrite(mut self, from: &'static str, to: &'static str) -> Self {
        self.url_rewrite = Some((from, to));
        self
    }

    /// Keeps only the first `limit` matching postings.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    async fn fetch(&self, url: &str) -> Result<SitemapDocument, String> {
        let body = get_text_with_retry(&self.client, url, &[], &self.retry)
            .await
            .map_err(|e| e.to_string())?;
        parse_sitemap(&body).map_err(|e| format!("malformed sitemap {url}: {e}"))
    }

    /// All `<url>` entries reachable from the root sitemap, in document order.
    async fn collect_pages(&self) -> Result<Vec<SitemapUrl>, ScrapeError> {
        let root = self
            .fetch(&self.sitemap_url)
            .await
            .map_err(|e| ScrapeError::discovery(&self.backend, e))?;

        let mut pages = Vec::new();
        // Depth-first, preserving child order.
        let mut pending: Vec<(SitemapDocument, usize)> = vec![(root, 0)];
        while let Some((document, depth)) = pending.pop() {
            match document {
                SitemapDocument::UrlSet(urls) => pages.extend(urls),
                SitemapDocument::Index(children) => {
                    if depth >= MAX_INDEX_DEPTH {
                        warn!("Sitemap index nesting exceeds {MAX_INDEX_DEPTH}; not following");
                        continue;
                    }
                    let mut fetched = Vec::with_capacity(children.len());
                    for child in children {
                        match self.fetch(&child).await {
                            Ok(doc) => fetched.push((doc, depth + 1)),
                            Err(e) => warn!("Skipping child sitemap {child}: {e}"),
                        }
                    }
                    pending.extend(fetched.into_iter().rev());
                }
            }
        }
        Ok(pages)
    }

    /// Filter, rewrite and tag raw sitemap pages.
    pub fn select(&self, pages: Vec<SitemapUrl>) -> Vec<ManifestEntry> {
        let mut manifest = Vec::new();
        for page in pages {
            let url = match self.url_rewrite {
                Some((from, to)) => page.loc.replace(from, to),
                None => page.loc,
            };
            if !self.job_pattern.is_match(&url) {
                continue;
            }
            debug!("Matched posting {url}");
            let mut entry = ManifestEntry::new(url).with_last_modified(page.lastmod);
            if let Some(id_pattern) = &self.id_pattern {
                if let Some(id) = id_pattern
                    .captures(&entry.url)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                {
                    entry = entry.with_field(REQ_ID_FIELD, id);
                }
            }
            manifest.push(entry);
            if self.limit.is_some_and(|limit| manifest.len() >= limit) {
                break;
            }
        }
        manifest
    }
}

#[async_trait]
impl ManifestResolver for SitemapResolver {
    async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError> {
        info!("Scraping the {} sitemap for job descriptions", self.sitemap_url);
        let pages = self.collect_pages().await?;
        Ok(self.select(pages))
    }

    fn columns(&self) -> Vec<String> {
        let mut columns = vec!["last_modified".to_string()];
        if self.id_pattern.is_some() {
            columns.push(REQ_ID_FIELD.to_string());
        }
        columns
    }
}
