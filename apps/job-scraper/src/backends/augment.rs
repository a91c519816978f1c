//! Backend-specific columns appended after the base analysis row.

use std::collections::HashMap;

use regex::Regex;
use serde_json::{json, Value};

use crate::analysis::models::BaseAnalysisResult;
use crate::backends::configs::{RequisitionRules, TemplateRules};
use crate::errors::ScrapeError;
use crate::models::{ManifestEntry, RawRecord};

/// Everything an augmentor may read for one posting.
pub struct AugmentInput<'a> {
    pub entry: &'a ManifestEntry,
    pub base: &'a BaseAnalysisResult,
    pub raw: &'a RawRecord,
}

impl AugmentInput<'_> {
    fn section_headers(&self) -> &str {
        self.raw.extra("section_headers").unwrap_or("")
    }

    fn job_info(&self) -> &str {
        self.base.job_info_raw.as_deref().unwrap_or("")
    }
}

pub trait Augmentor: Send + Sync {
    /// Column names, fixed for the life of the augmentor.
    fn columns(&self) -> Vec<String>;

    /// One value per column, in `columns()` order.
    fn augment(&self, input: &AugmentInput<'_>) -> Vec<Value>;
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, ScrapeError> {
    Regex::new(pattern).map_err(|e| ScrapeError::Config(format!("bad pattern '{pattern}': {e}")))
}

fn flag(matched: bool) -> Value {
    json!(u8::from(matched))
}

// ────────────────────────────────────────────────────────────────────────────
// None / passthrough
// ────────────────────────────────────────────────────────────────────────────

pub struct NoAugmentation;

impl Augmentor for NoAugmentation {
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn augment(&self, _input: &AugmentInput<'_>) -> Vec<Value> {
        Vec::new()
    }
}

/// Echoes the manifest fields into `*_sc` columns. Those are dropped at
/// export; they keep the row self-describing in the checkpoint.
pub struct Passthrough {
    manifest_columns: Vec<String>,
}

impl Passthrough {
    /// `manifest_columns` excludes `url`, which is always echoed first.
    pub fn new(manifest_columns: Vec<String>) -> Self {
        Self { manifest_columns }
    }
}

impl Augmentor for Passthrough {
    fn columns(&self) -> Vec<String> {
        std::iter::once("url_sc".to_string())
            .chain(self.manifest_columns.iter().map(|c| format!("{c}_sc")))
            .collect()
    }

    fn augment(&self, input: &AugmentInput<'_>) -> Vec<Value> {
        std::iter::once(Value::String(input.entry.url.clone()))
            .chain(
                self.manifest_columns
                    .iter()
                    .map(|c| input.entry.column_value(c)),
            )
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template checks
// ────────────────────────────────────────────────────────────────────────────

pub struct TemplateChecks {
    passthrough: Passthrough,
    leading_section: Regex,
    tagline: Regex,
    outline: Vec<Regex>,
}

impl TemplateChecks {
    pub fn new(passthrough: Passthrough, rules: &TemplateRules) -> Result<Self, ScrapeError> {
        Ok(Self {
            passthrough,
            leading_section: compile(&format!("^(?:{})", rules.leading_section))?,
            tagline: compile(rules.tagline)?,
            outline: rules
                .outline
                .iter()
                .map(|p| compile(p))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Augmentor for TemplateChecks {
    fn columns(&self) -> Vec<String> {
        let mut columns = self.passthrough.columns();
        columns.extend(
            ["no_extra_pre_text", "is_correct_tagline", "is_correct_template"].map(String::from),
        );
        columns
    }

    fn augment(&self, input: &AugmentInput<'_>) -> Vec<Value> {
        let body = &input.base.job_desc;
        let no_extra_pre_text = self.leading_section.is_match(input.section_headers())
            || self.leading_section.is_match(body);
        let correct_tagline = self.tagline.is_match(body);
        let correct_template = self.outline.iter().all(|re| re.is_match(body));

        let mut values = self.passthrough.augment(input);
        values.extend([
            flag(no_extra_pre_text),
            flag(correct_tagline),
            flag(correct_template),
        ]);
        values
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Requisition analysis
// ────────────────────────────────────────────────────────────────────────────

pub const UNASSIGNED_REGION: &str = "Unassigned";

pub struct RequisitionAnalysis {
    passthrough: Passthrough,
    regions: HashMap<&'static str, &'static str>,
    role_type: Regex,
    schedule: Regex,
    important_element: Regex,
    bad_description: Regex,
    legacy_format: Vec<Regex>,
}

impl RequisitionAnalysis {
    pub fn new(passthrough: Passthrough, rules: &RequisitionRules) -> Result<Self, ScrapeError> {
        Ok(Self {
            passthrough,
            regions: rules.regions.iter().copied().collect(),
            role_type: compile(r"Role Type\n(.*?)\n")?,
            schedule: compile(r"Job Schedule\n(.*?)\n")?,
            important_element: compile(rules.important_element)?,
            bad_description: compile(rules.bad_description)?,
            legacy_format: rules
                .legacy_format
                .iter()
                .map(|p| compile(p))
                .collect::<Result<_, _>>()?,
        })
    }

    fn capture(re: &Regex, text: &str) -> String {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

impl Augmentor for RequisitionAnalysis {
    fn columns(&self) -> Vec<String> {
        let mut columns = self.passthrough.columns();
        columns.extend(
            [
                "region",
                "role_type",
                "schedule_type",
                "contains_important_element",
                "contains_bad_description",
                "uses_bad_format",
            ]
            .map(String::from),
        );
        columns
    }

    fn augment(&self, input: &AugmentInput<'_>) -> Vec<Value> {
        let location = input.entry.field("primary_location").unwrap_or("");
        let region = self
            .regions
            .get(location)
            .copied()
            .unwrap_or(UNASSIGNED_REGION);
        let info = input.job_info();
        let body = &input.base.job_desc;

        let mut values = self.passthrough.augment(input);
        values.extend([
            json!(region),
            json!(Self::capture(&self.role_type, info)),
            json!(Self::capture(&self.schedule, info)),
            flag(self.important_element.is_match(input.section_headers())),
            flag(self.bad_description.is_match(body)),
            flag(self.legacy_format.iter().all(|re| re.is_match(body))),
        ]);
        values
    }
}
