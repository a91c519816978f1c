// Backend registry: one named bundle of discovery, extraction and
// augmentation per supported career site.

pub mod augment;
pub mod configs;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::analysis::models::BASE_HEADERS;
use crate::backends::augment::{
    compile, Augmentor, NoAugmentation, Passthrough, RequisitionAnalysis, TemplateChecks,
};
use crate::backends::configs::*;
use crate::errors::ScrapeError;
use crate::retry::RetryPolicy;
use crate::scraping::board_api::BoardApiResolver;
use crate::scraping::extractor::{RecordExtractor, RuleExtractor};
use crate::scraping::page::HttpPageSession;
use crate::scraping::paged_api::{
    LookbackWindow, PagedApiResolver, PositionsSource, RequisitionListSource,
    POSITIONS_PAGE_SIZE, REQUISITION_PAGE_SIZE,
};
use crate::scraping::sitemap::SitemapResolver;
use crate::scraping::{discovery_client, ManifestResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    #[value(name = "template_validation_scraper")]
    TemplateValidation,
    #[value(name = "api_scraper_with_analysis")]
    ApiWithAnalysis,
    #[value(name = "undetected_chrome_scraper")]
    UndetectedChrome,
    #[value(name = "session_api_scraper")]
    SessionApi,
    #[value(name = "basic_xpath_scraper")]
    BasicXpath,
    #[value(name = "custom_xml_scraper")]
    CustomXml,
    #[value(name = "greenhouse_api_scraper")]
    Greenhouse,
}

impl BackendKind {
    pub fn site(self) -> &'static SiteConfig {
        match self {
            BackendKind::TemplateValidation => &TEMPLATE_VALIDATION,
            BackendKind::ApiWithAnalysis => &API_WITH_ANALYSIS,
            BackendKind::UndetectedChrome => &UNDETECTED_CHROME,
            BackendKind::SessionApi => &SESSION_API,
            BackendKind::BasicXpath => &BASIC_XPATH,
            BackendKind::CustomXml => &CUSTOM_XML,
            BackendKind::Greenhouse => &GREENHOUSE,
        }
    }

    pub fn name(self) -> &'static str {
        self.site().name
    }
}

/// Run-level inputs some backends need at construction.
#[derive(Debug, Clone, Copy)]
pub struct BackendOptions {
    pub lookback_days: i64,
    pub today: NaiveDate,
}

/// The capabilities one run is driven through.
pub struct Backend {
    pub name: String,
    pub resolver: Box<dyn ManifestResolver>,
    pub extractor: Box<dyn RecordExtractor>,
    pub augmentor: Box<dyn Augmentor>,
}

impl Backend {
    pub fn new(
        name: impl Into<String>,
        resolver: Box<dyn ManifestResolver>,
        extractor: Box<dyn RecordExtractor>,
        augmentor: Box<dyn Augmentor>,
    ) -> Self {
        Self {
            name: name.into(),
            resolver,
            extractor,
            augmentor,
        }
    }

    /// `url` followed by the resolver's metadata columns.
    pub fn manifest_columns(&self) -> Vec<String> {
        std::iter::once("url".to_string())
            .chain(self.resolver.columns())
            .collect()
    }

    /// Base analysis columns followed by the augmentor's.
    pub fn row_columns(&self) -> Vec<String> {
        BASE_HEADERS
            .iter()
            .map(|c| c.to_string())
            .chain(self.augmentor.columns())
            .collect()
    }
}

fn optional_pattern(pattern: &str) -> Result<Option<regex::Regex>, ScrapeError> {
    if pattern.is_empty() {
        Ok(None)
    } else {
        compile(pattern).map(Some)
    }
}

fn sitemap_resolver(site: &SiteConfig) -> Result<SitemapResolver, ScrapeError> {
    SitemapResolver::new(
        site.name,
        site.domain,
        compile(site.job_pattern)?,
        optional_pattern(site.id_pattern)?,
        client(site)?,
        RetryPolicy::discovery(),
    )
}

fn client(site: &SiteConfig) -> Result<reqwest::Client, ScrapeError> {
    discovery_client(DISCOVERY_TIMEOUT)
        .map_err(|e| ScrapeError::Config(format!("{}: cannot build HTTP client: {e}", site.name)))
}

pub fn build_backend(kind: BackendKind, options: &BackendOptions) -> Result<Backend, ScrapeError> {
    let site = kind.site();

    let resolver: Box<dyn ManifestResolver> = match kind {
        BackendKind::TemplateValidation | BackendKind::BasicXpath => {
            Box::new(sitemap_resolver(site)?)
        }
        BackendKind::UndetectedChrome => {
            Box::new(sitemap_resolver(site)?.with_limit(UNDETECTED_CHROME_LIMIT))
        }
        BackendKind::CustomXml => {
            let (from, to) = CUSTOM_XML_REWRITE;
            Box::new(sitemap_resolver(site)?.with_url_rewrite(from, to))
        }
        BackendKind::ApiWithAnalysis => Box::new(PagedApiResolver::new(
            RequisitionListSource::new(
                site.name,
                REQUISITION_ENDPOINT,
                REQUISITION_POSTING_BASE,
                site.domain,
                REQUISITION_COUNTER_SELECTOR,
                client(site)?,
                RetryPolicy::discovery(),
            ),
            REQUISITION_PAGE_SIZE,
        )),
        BackendKind::SessionApi => Box::new(
            PagedApiResolver::new(
                PositionsSource::new(
                    site.name,
                    POSITIONS_ENDPOINT,
                    POSITIONS_PARAMS,
                    client(site)?,
                    RetryPolicy::discovery(),
                ),
                POSITIONS_PAGE_SIZE,
            )
            .with_window(LookbackWindow::ending_today(
                options.today,
                options.lookback_days,
            )),
        ),
        BackendKind::Greenhouse => Box::new(BoardApiResolver::new(
            site.name,
            GREENHOUSE_BOARD,
            client(site)?,
            RetryPolicy::discovery(),
        )),
    };

    let manifest_columns = resolver.columns();
    let augmentor: Box<dyn Augmentor> = match kind {
        BackendKind::TemplateValidation => Box::new(TemplateChecks::new(
            Passthrough::new(manifest_columns),
            &TEMPLATE_RULES,
        )?),
        BackendKind::ApiWithAnalysis => Box::new(RequisitionAnalysis::new(
            Passthrough::new(manifest_columns),
            &REQUISITION_RULES,
        )?),
        BackendKind::SessionApi | BackendKind::BasicXpath => {
            Box::new(Passthrough::new(manifest_columns))
        }
        BackendKind::UndetectedChrome | BackendKind::CustomXml | BackendKind::Greenhouse => {
            Box::new(NoAugmentation)
        }
    };

    let session = HttpPageSession::new(PAGE_TIMEOUT)
        .map_err(|e| ScrapeError::Config(format!("{}: {e}", site.name)))?;
    let extractor = RuleExtractor::new(session, site.fields, site.settle);

    Ok(Backend::new(
        site.name,
        resolver,
        Box::new(extractor),
        augmentor,
    ))
}
