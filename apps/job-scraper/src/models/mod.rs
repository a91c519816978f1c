use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One report row: base analysis values followed by augmentation values,
/// positionally aligned with the backend's declared columns.
pub type FinalRow = Vec<Value>;

/// A candidate job posting discovered before per-record processing begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    pub last_modified: Option<NaiveDate>,
    /// Discovery-time metadata (posting date, location, ids...).
    pub backend_fields: BTreeMap<String, String>,
}

impl ManifestEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_modified: None,
            backend_fields: BTreeMap::new(),
        }
    }

    pub fn with_last_modified(mut self, date: Option<NaiveDate>) -> Self {
        self.last_modified = date;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.backend_fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.backend_fields.get(name).map(String::as_str)
    }

    /// Value of a manifest column as it appears in the export.
    pub fn column_value(&self, column: &str) -> Value {
        match column {
            "url" => Value::String(self.url.clone()),
            "last_modified" => self
                .last_modified
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
            other => self
                .field(other)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
        }
    }
}

/// Raw fields pulled from one posting page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub title: String,
    /// Condensed HTML of the posting body.
    pub description: String,
    pub meta: Option<String>,
    /// Backend-defined extras such as `section_headers`.
    pub extra: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extra.get(name).map(String::as_str)
    }
}

/// Parses the leading `YYYY-MM-DD` of a timestamp such as a sitemap
/// `lastmod` or an ISO-8601 datetime.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_value_lookup() {
        let entry = ManifestEntry::new("https://example.com/jobs/1")
            .with_last_modified(NaiveDate::from_ymd_opt(2024, 5, 2))
            .with_field("location", "Berlin");
        assert_eq!(entry.column_value("url"), "https://example.com/jobs/1");
        assert_eq!(entry.column_value("last_modified"), "2024-05-02");
        assert_eq!(entry.column_value("location"), "Berlin");
        assert_eq!(entry.column_value("missing"), Value::Null);
    }

    #[test]
    fn test_parse_date_prefix() {
        assert_eq!(
            parse_date_prefix("2024-03-01T10:22:00+00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date_prefix("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date_prefix("yesterday"), None);
        assert_eq!(parse_date_prefix(""), None);
    }
}
