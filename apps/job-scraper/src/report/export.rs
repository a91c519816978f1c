//! Final table assembly and CSV output.
//!
//! Merge rule: manifest columns first, then row columns. A row column whose
//! name is already taken by the manifest is renamed `<name>_scraped`. After
//! `scrape_date` is appended, every column ending in `_sc` or containing
//! `_scraped` is dropped.
//!
//! Rows are matched to manifest entries in manifest order: each row takes
//! the next entry with its URL at or after the previous match, so skipped
//! records and repeated URLs both keep their own metadata.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::errors::ScrapeError;
use crate::models::{FinalRow, ManifestEntry};

pub const SCRAPE_DATE_COLUMN: &str = "scrape_date";

/// A rectangular table: every row has one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<FinalRow>,
}

impl ReportTable {
    /// Fails if any row's width differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<FinalRow>) -> Result<Self, ScrapeError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ScrapeError::Export(format!(
                "row {idx} has {} values but the schema has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn is_internal_column(name: &str) -> bool {
    name.ends_with("_sc") || name.contains("_scraped")
}

/// Joins each processed row with its manifest entry by URL (row column
/// `url`), stamps the scrape date and drops internal columns.
pub fn merge_with_manifest(
    manifest: &[ManifestEntry],
    manifest_columns: &[String],
    table: &ReportTable,
    scrape_date: NaiveDate,
) -> ReportTable {
    let taken: HashSet<&str> = manifest_columns.iter().map(String::as_str).collect();
    let mut columns: Vec<String> = manifest_columns.to_vec();
    columns.extend(table.columns.iter().map(|c| {
        if taken.contains(c.as_str()) {
            format!("{c}_scraped")
        } else {
            c.clone()
        }
    }));
    columns.push(SCRAPE_DATE_COLUMN.to_string());

    let mut cursor = 0;
    let url_idx = table.column_index("url");
    let date = Value::String(scrape_date.format("%Y-%m-%d").to_string());

    let rows: Vec<FinalRow> = table
        .rows
        .iter()
        .map(|row| {
            let url = url_idx.and_then(|i| row[i].as_str());
            let entry = url.and_then(|u| match_entry(manifest, &mut cursor, u));
            if entry.is_none() {
                warn!("No manifest entry for processed row {url:?}; metadata left empty");
            }
            let mut merged: FinalRow = manifest_columns
                .iter()
                .map(|c| match entry {
                    Some(e) => e.column_value(c),
                    None if c == "url" => url.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null),
                    None => Value::Null,
                })
                .collect();
            merged.extend(row.iter().cloned());
            merged.push(date.clone());
            merged
        })
        .collect();

    let keep: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !is_internal_column(c))
        .map(|(i, _)| i)
        .collect();

    ReportTable {
        columns: keep.iter().map(|&i| columns[i].clone()).collect(),
        rows: rows
            .into_iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect(),
    }
}

/// Next entry for `url` at or after `cursor`, advancing past it. Falls back
/// to the first entry with that URL when the rows are out of manifest order.
fn match_entry<'a>(
    manifest: &'a [ManifestEntry],
    cursor: &mut usize,
    url: &str,
) -> Option<&'a ManifestEntry> {
    if let Some(pos) = manifest[*cursor..].iter().position(|e| e.url == url) {
        let idx = *cursor + pos;
        *cursor = idx + 1;
        return Some(&manifest[idx]);
    }
    manifest.iter().find(|e| e.url == url)
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Writes `table` as CSV with a header row. An empty table still gets its
/// header.
pub fn write_csv(path: &Path, table: &ReportTable) -> Result<(), ScrapeError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(render_cell))?;
    }
    writer
        .flush()
        .map_err(|e| ScrapeError::Export(format!("{}: {e}", path.display())))
}

/// Writes the skipped-URL list, one `url` column.
pub fn write_skipped(path: &Path, urls: &[String]) -> Result<(), ScrapeError> {
    let table = ReportTable {
        columns: vec!["url".to_string()],
        rows: urls.iter().map(|u| vec![Value::String(u.clone())]).collect(),
    };
    write_csv(path, &table)
}

pub fn merged_table_path(dir: &Path, backend: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{backend}_merged_table_{}.csv", date.format("%Y-%m-%d")))
}

pub fn skipped_urls_path(dir: &Path, backend: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{backend}_skipped_urls_{}.csv", date.format("%Y-%m-%d")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn manifest() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry::new("https://example.com/jobs/1")
                .with_last_modified(NaiveDate::from_ymd_opt(2024, 6, 1))
                .with_field("location", "Remote"),
            ManifestEntry::new("https://example.com/jobs/2").with_field("location", "Berlin"),
            ManifestEntry::new("https://example.com/jobs/3").with_field("location", "Austin"),
        ]
    }

    #[test]
    fn test_table_rejects_ragged_rows() {
        let err = ReportTable::new(strings(&["url", "title"]), vec![vec![json!("u")]]).unwrap_err();
        assert!(matches!(err, ScrapeError::Export(_)));
    }

    #[test]
    fn test_merge_renames_collisions_and_drops_internal_columns() {
        let table = ReportTable::new(
            strings(&["url", "title", "url_sc", "location_sc", "region"]),
            vec![vec![
                json!("https://example.com/jobs/1"),
                json!("SRE"),
                json!("https://example.com/jobs/1"),
                json!("Remote"),
                json!("Region1"),
            ]],
        )
        .unwrap();
        let merged = merge_with_manifest(
            &manifest(),
            &strings(&["url", "last_modified", "location"]),
            &table,
            date(),
        );

        assert_eq!(
            merged.columns,
            strings(&["url", "last_modified", "location", "title", "region", "scrape_date"])
        );
        assert_eq!(
            merged.rows[0],
            vec![
                json!("https://example.com/jobs/1"),
                json!("2024-06-01"),
                json!("Remote"),
                json!("SRE"),
                json!("Region1"),
                json!("2024-06-15"),
            ]
        );
    }

    #[test]
    fn test_merge_aligns_by_url_when_records_were_skipped() {
        // Posting 2 was skipped; row for posting 3 must carry posting 3's metadata.
        let table = ReportTable::new(
            strings(&["url", "title"]),
            vec![
                vec![json!("https://example.com/jobs/1"), json!("SRE")],
                vec![json!("https://example.com/jobs/3"), json!("Chef")],
            ],
        )
        .unwrap();
        let merged =
            merge_with_manifest(&manifest(), &strings(&["url", "location"]), &table, date());
        assert_eq!(merged.rows.len(), 2);
        assert_eq!(merged.rows[1][1], json!("Austin"));
        assert_eq!(merged.rows[1][2], json!("Chef"));
    }

    #[test]
    fn test_merge_keeps_metadata_of_each_duplicate_url() {
        let manifest = vec![
            ManifestEntry::new("https://example.com/jobs/1").with_field("location", "Berlin"),
            ManifestEntry::new("https://example.com/jobs/2").with_field("location", "Remote"),
            ManifestEntry::new("https://example.com/jobs/1").with_field("location", "Austin"),
        ];
        let table = ReportTable::new(
            strings(&["url", "title"]),
            vec![
                vec![json!("https://example.com/jobs/1"), json!("A")],
                vec![json!("https://example.com/jobs/1"), json!("B")],
            ],
        )
        .unwrap();
        let merged =
            merge_with_manifest(&manifest, &strings(&["url", "location"]), &table, date());
        assert_eq!(merged.rows[0][1], json!("Berlin"));
        assert_eq!(merged.rows[0][2], json!("A"));
        assert_eq!(merged.rows[1][1], json!("Austin"));
        assert_eq!(merged.rows[1][2], json!("B"));
    }

    #[test]
    fn test_merge_with_unknown_url_keeps_row() {
        let table = ReportTable::new(
            strings(&["url", "title"]),
            vec![vec![json!("https://example.com/jobs/99"), json!("Ghost")]],
        )
        .unwrap();
        let merged =
            merge_with_manifest(&manifest(), &strings(&["url", "location"]), &table, date());
        assert_eq!(
            merged.rows[0],
            vec![json!("https://example.com/jobs/99"), Value::Null, json!("Ghost"), json!("2024-06-15")]
        );
    }

    #[test]
    fn test_write_csv_renders_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = ReportTable::new(
            strings(&["url", "count", "detail", "note"]),
            vec![vec![
                json!("https://example.com/jobs/1"),
                json!(3),
                json!({"Grammar": 2}),
                Value::Null,
            ]],
        )
        .unwrap();
        write_csv(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "url,count,detail,note\nhttps://example.com/jobs/1,3,\"{\"\"Grammar\"\":2}\",\n"
        );
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&path, &ReportTable::new(strings(&["url", "title"]), vec![]).unwrap()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "url,title\n");
    }

    #[test]
    fn test_output_file_names() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            merged_table_path(dir, "basic_xpath_scraper", date()),
            Path::new("/tmp/out/basic_xpath_scraper_merged_table_2024-06-15.csv")
        );
        assert_eq!(
            skipped_urls_path(dir, "basic_xpath_scraper", date()),
            Path::new("/tmp/out/basic_xpath_scraper_skipped_urls_2024-06-15.csv")
        );
    }
}
