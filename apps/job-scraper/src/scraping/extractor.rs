//! Rule-driven extraction of one posting page into a `RawRecord`.
//!
//! Each backend declares an ordered list of `FieldRule`s. `title` and
//! `description` must resolve to non-empty values; any other rule that
//! fails is logged and left out of the record.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::ScrapeError;
use crate::html::{condense_html, untag_html};
use crate::models::RawRecord;
use crate::scraping::page::{PageElement, PageSession};

const REQUIRED_FIELDS: &[&str] = &["title", "description"];

/// How located elements become a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Visible text of the first match.
    Text,
    /// Cleaned markup of the first match.
    CondensedHtml,
    /// Text blocks of the first match, one per line.
    UntaggedHtml,
}

impl Transform {
    fn apply(self, elements: &[PageElement]) -> Option<String> {
        let first = elements.first()?;
        let value = match self {
            Transform::Text => first.read_text().trim().to_string(),
            Transform::CondensedHtml => condense_html(&first.inner_html),
            Transform::UntaggedHtml => untag_html(&first.inner_html),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub transform: Transform,
}

impl FieldRule {
    pub const fn new(name: &'static str, selector: &'static str, transform: Transform) -> Self {
        Self {
            name,
            selector,
            transform,
        }
    }
}

#[async_trait]
pub trait RecordExtractor: Send {
    async fn extract(&mut self, url: &str) -> Result<RawRecord, ScrapeError>;
}

/// Applies field rules against a page session.
pub struct RuleExtractor<S: PageSession> {
    session: S,
    rules: Vec<FieldRule>,
    settle: Duration,
}

impl<S: PageSession> RuleExtractor<S> {
    /// `settle` is waited after each navigation before querying the page.
    pub fn new(session: S, rules: &[FieldRule], settle: Duration) -> Self {
        Self {
            session,
            rules: rules.to_vec(),
            settle,
        }
    }

    fn apply_rule(&self, rule: &FieldRule) -> Result<Option<String>, String> {
        let elements = self
            .session
            .locate_all(rule.selector)
            .map_err(|e| e.to_string())?;
        Ok(rule
            .transform
            .apply(&elements)
            .filter(|value| !value.is_empty()))
    }
}

#[async_trait]
impl<S: PageSession> RecordExtractor for RuleExtractor<S> {
    async fn extract(&mut self, url: &str) -> Result<RawRecord, ScrapeError> {
        // Every record starts from a clean session: no cookies or page left over.
        self.session
            .reset()
            .map_err(|e| ScrapeError::extraction(url, e.to_string()))?;
        self.session
            .navigate(url)
            .await
            .map_err(|e| ScrapeError::extraction(url, e.to_string()))?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for rule in &self.rules {
            match self.apply_rule(rule) {
                Ok(Some(value)) => {
                    fields.insert(rule.name.to_string(), value);
                }
                Ok(None) => warn!(
                    "Skipped {}! Selector '{}' matched nothing on {url}",
                    rule.name, rule.selector
                ),
                Err(e) => warn!("Skipped {}! Selector '{}' Error: {e}", rule.name, rule.selector),
            }
        }

        for required in REQUIRED_FIELDS {
            if !fields.contains_key(*required) {
                return Err(ScrapeError::extraction(
                    url,
                    format!("no valid {required} on page"),
                ));
            }
        }

        let title = fields.remove("title").unwrap_or_default();
        let description = fields.remove("description").unwrap_or_default();
        let meta = fields.remove("meta");
        debug!("Extracted '{title}' from {url}");

        Ok(RawRecord {
            title,
            description,
            meta,
            extra: fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::page::{locate_in, PageError};
    use std::collections::HashMap;

    /// Serves canned HTML per URL and counts resets.
    struct StaticSession {
        pages: HashMap<String, String>,
        current: Option<String>,
        resets: usize,
    }

    impl StaticSession {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
                current: None,
                resets: 0,
            }
        }
    }

    #[async_trait]
    impl PageSession for StaticSession {
        async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
            self.current = Some(self.pages.get(url).cloned().ok_or_else(|| {
                PageError::ResourceUnavailable {
                    url: url.to_string(),
                    message: "404".into(),
                }
            })?);
            Ok(())
        }

        fn locate_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError> {
            locate_in(self.current.as_deref().ok_or(PageError::NoDocument)?, selector)
        }

        fn reset(&mut self) -> Result<(), PageError> {
            self.resets += 1;
            self.current = None;
            Ok(())
        }
    }

    const RULES: &[FieldRule] = &[
        FieldRule::new("title", "h1.title", Transform::Text),
        FieldRule::new("description", "div.body", Transform::CondensedHtml),
        FieldRule::new("meta", "ul.meta", Transform::UntaggedHtml),
        FieldRule::new("section_headers", "div.headers", Transform::UntaggedHtml),
    ];

    const FULL: &str = r#"<html><body>
        <h1 class="title">  Backend Engineer </h1>
        <div class="body"><p style="color:red">Build <b>APIs</b>.</p><script>x()</script></div>
        <ul class="meta"><li>Role Type</li><li>Full time</li></ul>
    </body></html>"#;

    const NO_TITLE: &str = r#"<html><body><div class="body"><p>Orphan</p></div></body></html>"#;

    #[tokio::test]
    async fn test_extracts_required_and_optional_fields() {
        let session = StaticSession::new(&[("https://example.com/jobs/1", FULL)]);
        let mut extractor = RuleExtractor::new(session, RULES, Duration::ZERO);
        let record = extractor.extract("https://example.com/jobs/1").await.unwrap();

        assert_eq!(record.title, "Backend Engineer");
        assert_eq!(record.description, "<p>Build <b>APIs</b>.</p>");
        assert_eq!(record.meta.as_deref(), Some("Role Type\nFull time"));
        assert_eq!(record.extra("section_headers"), None);
        assert_eq!(extractor.session.resets, 1);
    }

    #[tokio::test]
    async fn test_missing_title_is_extraction_error() {
        let session = StaticSession::new(&[("https://example.com/jobs/2", NO_TITLE)]);
        let mut extractor = RuleExtractor::new(session, RULES, Duration::ZERO);
        let err = extractor
            .extract("https://example.com/jobs/2")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_page_is_extraction_error() {
        let session = StaticSession::new(&[]);
        let mut extractor = RuleExtractor::new(session, RULES, Duration::ZERO);
        let err = extractor
            .extract("https://example.com/gone")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https://example.com/gone"));
    }

    #[tokio::test]
    async fn test_session_is_reset_before_every_record() {
        let session = StaticSession::new(&[
            ("https://example.com/jobs/1", FULL),
            ("https://example.com/jobs/2", NO_TITLE),
        ]);
        let mut extractor = RuleExtractor::new(session, RULES, Duration::ZERO);
        let _ = extractor.extract("https://example.com/jobs/1").await;
        let _ = extractor.extract("https://example.com/jobs/2").await;
        assert_eq!(extractor.session.resets, 2);
    }
}
