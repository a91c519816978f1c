//! Static site table: where each backend discovers postings and how it
//! reads them.

use std::time::Duration;

use crate::scraping::extractor::{FieldRule, Transform};

/// Per-site scraping parameters.
#[derive(Debug, Clone, Copy)]
pub struct SiteConfig {
    pub name: &'static str,
    pub domain: &'static str,
    /// Sitemap URLs must match this to count as postings. Empty for API sites.
    pub job_pattern: &'static str,
    /// First capture group is the posting id. Empty disables id capture.
    pub id_pattern: &'static str,
    pub fields: &'static [FieldRule],
    /// Wait after each navigation before reading the page.
    pub settle: Duration,
}

pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

const STANDARD_FIELDS: &[FieldRule] = &[
    FieldRule::new("title", "h1.job-title", Transform::Text),
    FieldRule::new("description", "div.job-description", Transform::CondensedHtml),
    FieldRule::new("meta", "div.job-meta", Transform::UntaggedHtml),
];

pub const TEMPLATE_VALIDATION: SiteConfig = SiteConfig {
    name: "template_validation_scraper",
    domain: "https://careers.example.com",
    job_pattern: r"/en/jobs/\S",
    id_pattern: r"jobs/(.+?)/",
    fields: &[
        FieldRule::new("title", "h1.job-title", Transform::Text),
        FieldRule::new("description", "div.job-description", Transform::CondensedHtml),
        FieldRule::new("meta", "div.job-meta", Transform::UntaggedHtml),
        FieldRule::new("section_headers", "div.job-description h2", Transform::UntaggedHtml),
    ],
    settle: Duration::from_secs(5),
};

pub const API_WITH_ANALYSIS: SiteConfig = SiteConfig {
    name: "api_scraper_with_analysis",
    domain: "https://ocs.example.com",
    job_pattern: "/en/job/",
    id_pattern: r"(R\d*?)/",
    fields: &[
        FieldRule::new("title", "h1.job-details__title", Transform::Text),
        FieldRule::new("description", "div.job-details__description-content", Transform::CondensedHtml),
        FieldRule::new("meta", "ul.job-meta__list", Transform::UntaggedHtml),
        FieldRule::new("section_headers", "div.job-details__description-content h3", Transform::UntaggedHtml),
    ],
    settle: Duration::from_secs(5),
};

pub const UNDETECTED_CHROME: SiteConfig = SiteConfig {
    name: "undetected_chrome_scraper",
    domain: "https://careers.example.com/example-jobs",
    job_pattern: "/en/job/",
    id_pattern: r"(R\d*?)/",
    fields: STANDARD_FIELDS,
    settle: Duration::from_secs(30),
};

pub const SESSION_API: SiteConfig = SiteConfig {
    name: "session_api_scraper",
    domain: "https://jobs.example.com/careers",
    job_pattern: "",
    id_pattern: "",
    fields: STANDARD_FIELDS,
    settle: Duration::from_secs(5),
};

pub const BASIC_XPATH: SiteConfig = SiteConfig {
    name: "basic_xpath_scraper",
    domain: "https://www.examplejobs.com/sitemap.xml",
    job_pattern: "/en/jobs/",
    id_pattern: "",
    fields: STANDARD_FIELDS,
    settle: Duration::from_secs(5),
};

pub const CUSTOM_XML: SiteConfig = SiteConfig {
    name: "custom_xml_scraper",
    domain: "https://careers.example.com/sitemap1.xml",
    job_pattern: "/jobs/.*lang=en-us",
    id_pattern: r"jobs/(.+?)[?]",
    fields: STANDARD_FIELDS,
    settle: Duration::from_secs(5),
};

pub const GREENHOUSE: SiteConfig = SiteConfig {
    name: "greenhouse_api_scraper",
    domain: "https://www.example.com/company/careers/opportunities.html",
    job_pattern: "/jobs/.*gh_jid",
    id_pattern: r"jobs/(.+?)[?]",
    fields: &[
        FieldRule::new("title", "h1.app-title", Transform::Text),
        FieldRule::new("description", "div#content", Transform::CondensedHtml),
        FieldRule::new("meta", "div.location", Transform::UntaggedHtml),
    ],
    settle: Duration::from_secs(5),
};

// ────────────────────────────────────────────────────────────────────────────
// Discovery endpoints
// ────────────────────────────────────────────────────────────────────────────

pub const REQUISITION_ENDPOINT: &str =
    "https://ocs.example.com/hcmRestApi/resources/latest/recruitingCEJobRequisitions";
pub const REQUISITION_POSTING_BASE: &str = "https://ocs.example.com/en/sites/job";
pub const REQUISITION_COUNTER_SELECTOR: &str = ".search-filters__counter";

pub const POSITIONS_ENDPOINT: &str = "https://jobs.example.com/api/apply/v2/jobs";
pub const POSITIONS_PARAMS: &[(&str, &str)] = &[
    ("domain", "example.com"),
    ("query", "DEPARTMENT"),
    ("pid", "SAMPLE"),
];

pub const GREENHOUSE_BOARD: &str = "https://boards-api.greenhouse.io/v1/boards/example";

/// The bounded sitemap backend only ever looks at this many postings.
pub const UNDETECTED_CHROME_LIMIT: usize = 5;

/// Host typo in the custom sitemap, fixed on every discovered URL.
pub const CUSTOM_XML_REWRITE: (&str, &str) = (".co/", ".com/");

// ────────────────────────────────────────────────────────────────────────────
// Site-specific checks
// ────────────────────────────────────────────────────────────────────────────

/// Template rules for the template-validation site.
pub struct TemplateRules {
    /// Must match at the very start of the section headers or the body.
    pub leading_section: &'static str,
    pub tagline: &'static str,
    /// All of these must appear in the body.
    pub outline: &'static [&'static str],
}

pub const TEMPLATE_RULES: TemplateRules = TemplateRules {
    leading_section: "(?i)about the role",
    tagline: "Build what matters",
    outline: &[
        "(?i)what you.ll do",
        "(?i)what you.ll bring",
        "(?i)what we offer",
    ],
};

/// Requisition checks for the API-with-analysis site.
pub struct RequisitionRules {
    pub regions: &'static [(&'static str, &'static str)],
    pub important_element: &'static str,
    pub bad_description: &'static str,
    /// The legacy layout is detected only when all of these appear.
    pub legacy_format: &'static [&'static str],
}

pub const REQUISITION_RULES: RequisitionRules = RequisitionRules {
    regions: &[
        ("Country1", "Region1"),
        ("Country2", "Region1"),
        ("Country3", "Region2"),
    ],
    important_element: "(?i)equal opportunity",
    bad_description: r"(?i)lorem ipsum|\[insert",
    legacy_format: &[
        "Job Summary",
        "Essential Functions",
        "Minimum Qualifications",
        "Preferred Qualifications",
        "Working Conditions",
    ],
};
