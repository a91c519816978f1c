//! Page layer: navigate to a posting and query it by CSS selector.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Resource unavailable: {url}: {message}")]
    ResourceUnavailable { url: String, message: String },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("No page loaded")]
    NoDocument,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// A located element, detached from the document it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageElement {
    pub text: String,
    pub inner_html: String,
    pub attributes: BTreeMap<String, String>,
}

impl PageElement {
    pub fn read_text(&self) -> &str {
        &self.text
    }
}

/// Browser-like session. Holds navigation state and cookies between calls.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// All elements matching `selector` on the current page, in document order.
    fn locate_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError>;

    /// Drops cookies and the loaded page.
    fn reset(&mut self) -> Result<(), PageError>;
}

/// Static-HTML session over `reqwest` with a per-session cookie jar.
pub struct HttpPageSession {
    client: Client,
    timeout: Duration,
    document: Option<String>,
}

impl HttpPageSession {
    pub fn new(timeout: Duration) -> Result<Self, PageError> {
        Ok(Self {
            client: build_client(timeout)?,
            timeout,
            document: None,
        })
    }
}

fn build_client(timeout: Duration) -> Result<Client, PageError> {
    Ok(Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        self.document = None;
        let unavailable = |message: String| PageError::ResourceUnavailable {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unavailable(e.to_string()))?;
        let body = response.text().await.map_err(|e| unavailable(e.to_string()))?;
        debug!("Loaded {url}: {} bytes", body.len());
        self.document = Some(body);
        Ok(())
    }

    fn locate_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError> {
        let document = self.document.as_deref().ok_or(PageError::NoDocument)?;
        locate_in(document, selector)
    }

    fn reset(&mut self) -> Result<(), PageError> {
        self.client = build_client(self.timeout)?;
        self.document = None;
        Ok(())
    }
}

/// Runs `selector` against an HTML document.
pub fn locate_in(document: &str, selector: &str) -> Result<Vec<PageElement>, PageError> {
    let parsed =
        Selector::parse(selector).map_err(|_| PageError::InvalidSelector(selector.to_string()))?;
    let html = Html::parse_document(document);
    Ok(html
        .select(&parsed)
        .map(|el| PageElement {
            text: el.text().collect::<String>(),
            inner_html: el.inner_html(),
            attributes: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .collect())
}
