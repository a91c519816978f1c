//! One report run, driven through a backend's capabilities.
//!
//! Phases: Init → Discovering → Iterating → PostProcessing → Merging →
//! Exported. Fatal errors (discovery, checkpoint writes, export) abort in
//! whatever phase they occur; a failing record only lands in the skip list.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::backends::augment::AugmentInput;
use crate::backends::Backend;
use crate::errors::ScrapeError;
use crate::models::{FinalRow, ManifestEntry};
use crate::report::export::{
    merge_with_manifest, merged_table_path, skipped_urls_path, write_csv, write_skipped,
    ReportTable,
};
use crate::state::RunContext;

/// Status line cadence, in successfully processed records.
const STATUS_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    Discovering,
    Iterating,
    PostProcessing,
    Merging,
    Exported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub discovered: usize,
    /// Rows in the export, resumed rows included.
    pub rows: usize,
    pub skipped: Vec<String>,
    pub merged_table: PathBuf,
    pub skipped_file: Option<PathBuf>,
}

pub struct ReportSession<'a> {
    backend: Backend,
    ctx: &'a RunContext,
    phase: SessionPhase,
    rows: Vec<FinalRow>,
    skipped: Vec<String>,
}

impl<'a> ReportSession<'a> {
    pub fn new(backend: Backend, ctx: &'a RunContext) -> Self {
        Self {
            backend,
            ctx,
            phase: SessionPhase::Init,
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn enter(&mut self, phase: SessionPhase) {
        debug!("{}: {:?} -> {:?}", self.backend.name, self.phase, phase);
        info!("| --- {} : {:?} --- |", self.backend.name, phase);
        self.phase = phase;
    }

    pub async fn run(mut self) -> Result<RunSummary, ScrapeError> {
        let row_columns = self.backend.row_columns();
        let manifest_columns = self.backend.manifest_columns();

        self.enter(SessionPhase::Discovering);
        let manifest = self.backend.resolver.resolve().await?;
        info!("| --- Found {} Job Descriptions --- |", manifest.len());

        let resume_from = if self.ctx.options.resume {
            let checkpoint = self.ctx.checkpoints.load()?;
            if let Some((idx, row)) = checkpoint
                .rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != row_columns.len())
            {
                return Err(ScrapeError::Config(format!(
                    "checkpoint row {idx} has {} values; {} expects {}",
                    row.len(),
                    self.backend.name,
                    row_columns.len()
                )));
            }
            info!(
                "Resuming after {:?} with {} saved rows",
                checkpoint.last_scraped_url,
                checkpoint.rows.len()
            );
            self.rows = checkpoint.rows;
            checkpoint.last_scraped_url
        } else {
            None
        };

        self.enter(SessionPhase::Iterating);
        if self.ctx.options.dev_mode {
            info!("Dev mode: evaluation columns hold a placeholder");
        }
        self.process_records(&manifest, resume_from.as_deref()).await?;

        self.enter(SessionPhase::PostProcessing);
        let table = ReportTable::new(row_columns, std::mem::take(&mut self.rows))?;

        self.enter(SessionPhase::Merging);
        let run_date = self.ctx.options.run_date;
        let merged = merge_with_manifest(&manifest, &manifest_columns, &table, run_date);

        let output_dir = &self.ctx.options.output_dir;
        let merged_table = merged_table_path(output_dir, &self.backend.name, run_date);
        write_csv(&merged_table, &merged)?;
        let skipped_file = if self.skipped.is_empty() {
            None
        } else {
            let path = skipped_urls_path(output_dir, &self.backend.name, run_date);
            write_skipped(&path, &self.skipped)?;
            Some(path)
        };

        self.enter(SessionPhase::Exported);
        Ok(RunSummary {
            discovered: manifest.len(),
            rows: merged.rows.len(),
            skipped: self.skipped,
            merged_table,
            skipped_file,
        })
    }

    /// Walks the manifest in order. With `resume_from`, everything up to and
    /// including that URL is skipped without touching the network.
    async fn process_records(
        &mut self,
        manifest: &[ManifestEntry],
        resume_from: Option<&str>,
    ) -> Result<(), ScrapeError> {
        let total = manifest.len();
        let mut seeking = resume_from.is_some();
        let mut processed = 0;

        for (idx, entry) in manifest.iter().enumerate() {
            if seeking {
                if resume_from == Some(entry.url.as_str()) {
                    seeking = false;
                    info!("Caught up to checkpoint at job number {}: {}", idx + 1, entry.url);
                }
                continue;
            }

            match self.process_record(entry).await {
                Ok(row) => {
                    self.rows.push(row);
                    processed += 1;
                    self.ctx.checkpoints.save(&entry.url, &self.rows)?;
                    if let Some(line) = status_line(processed, total) {
                        info!("{line}");
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("{} skipped! Error: {e}", entry.url);
                    self.skipped.push(entry.url.clone());
                }
            }
        }

        if seeking {
            warn!(
                "Checkpoint URL {:?} never appeared in the manifest; nothing new was processed",
                resume_from
            );
        }
        Ok(())
    }

    async fn process_record(&mut self, entry: &ManifestEntry) -> Result<FinalRow, ScrapeError> {
        info!("scraping url: {}", entry.url);
        let raw = self.backend.extractor.extract(&entry.url).await?;
        let base = self.ctx.pipeline.analyze(&entry.url, &raw).await;
        let extension = self.backend.augmentor.augment(&AugmentInput {
            entry,
            base: &base,
            raw: &raw,
        });
        let mut row = base.into_values();
        row.extend(extension);
        Ok(row)
    }
}

/// Progress line logged after every `STATUS_EVERY`th processed record.
fn status_line(processed: usize, total: usize) -> Option<String> {
    (processed != 0 && processed % STATUS_EVERY == 0)
        .then(|| format!("Successfully scraped [{processed}/{total}] job descriptions."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::evaluation::Evaluator;
    use crate::analysis::models::BASE_HEADERS;
    use crate::analysis::pipeline::AnalysisPipeline;
    use crate::backends::augment::{NoAugmentation, Passthrough};
    use crate::langtools::LanguageToolClient;
    use crate::llm_client::{DevModeCompletion, DEV_MODE_PLACEHOLDER};
    use crate::models::RawRecord;
    use crate::report::checkpoint::CheckpointStore;
    use crate::retry::RetryPolicy;
    use crate::scraping::extractor::RecordExtractor;
    use crate::scraping::ManifestResolver;
    use crate::state::RunOptions;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, HashSet};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    struct FixedManifest(Vec<ManifestEntry>);

    #[async_trait]
    impl ManifestResolver for FixedManifest {
        async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError> {
            Ok(self.0.clone())
        }

        fn columns(&self) -> Vec<String> {
            vec!["last_modified".into()]
        }
    }

    struct FailingManifest;

    #[async_trait]
    impl ManifestResolver for FailingManifest {
        async fn resolve(&self) -> Result<Vec<ManifestEntry>, ScrapeError> {
            Err(ScrapeError::discovery("test", "sitemap unreachable"))
        }

        fn columns(&self) -> Vec<String> {
            Vec::new()
        }
    }

    /// Builds a record from the URL; URLs in `broken` fail. Logs every visit.
    struct FakeExtractor {
        broken: HashSet<String>,
        visited: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RecordExtractor for FakeExtractor {
        async fn extract(&mut self, url: &str) -> Result<RawRecord, ScrapeError> {
            self.visited.lock().unwrap().push(url.to_string());
            if self.broken.contains(url) {
                return Err(ScrapeError::extraction(url, "no valid title on page"));
            }
            Ok(RawRecord {
                title: format!("Title for {url}"),
                description: "<p>Lead a supportive team.</p><ul><li>Rust</li></ul>".into(),
                meta: None,
                extra: BTreeMap::new(),
            })
        }
    }

    fn entries() -> Vec<ManifestEntry> {
        (1..=3)
            .map(|i| {
                ManifestEntry::new(format!("https://example.com/jobs/{i}"))
                    .with_last_modified(NaiveDate::from_ymd_opt(2024, 6, i))
            })
            .collect()
    }

    fn context(dir: &Path, resume: bool) -> RunContext {
        let evaluator = Evaluator::new(Arc::new(DevModeCompletion), RetryPolicy::immediate(1), "test");
        let language = Arc::new(LanguageToolClient::new(None).unwrap());
        RunContext::new(
            RunOptions {
                dev_mode: true,
                lookback_days: 14,
                resume,
                output_dir: dir.to_path_buf(),
                run_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            },
            CheckpointStore::new(dir),
            AnalysisPipeline::new(language, evaluator),
        )
    }

    fn backend(
        manifest: Vec<ManifestEntry>,
        broken: &[&str],
        visited: Arc<Mutex<Vec<String>>>,
    ) -> Backend {
        Backend::new(
            "fake_scraper",
            Box::new(FixedManifest(manifest)),
            Box::new(FakeExtractor {
                broken: broken.iter().map(|s| s.to_string()).collect(),
                visited,
            }),
            Box::new(Passthrough::new(vec!["last_modified".into()])),
        )
    }

    fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_status_line_on_every_tenth_record_including_the_last() {
        assert_eq!(status_line(0, 20), None);
        assert_eq!(status_line(9, 20), None);
        assert_eq!(
            status_line(10, 20).as_deref(),
            Some("Successfully scraped [10/20] job descriptions.")
        );
        assert_eq!(
            status_line(20, 20).as_deref(),
            Some("Successfully scraped [20/20] job descriptions.")
        );
    }

    #[tokio::test]
    async fn test_end_to_end_dev_mode_run() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let visited = Arc::new(Mutex::new(Vec::new()));
        let summary = ReportSession::new(backend(entries(), &[], visited.clone()), &ctx)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.rows, 3);
        assert!(summary.skipped_file.is_none());
        assert_eq!(
            summary.merged_table,
            dir.path().join("fake_scraper_merged_table_2024-06-15.csv")
        );

        let (headers, rows) = read_csv(&summary.merged_table);
        let mut expected: Vec<String> = vec!["url".into(), "last_modified".into()];
        expected.extend(BASE_HEADERS[1..].iter().map(|c| c.to_string()));
        expected.push("scrape_date".into());
        assert_eq!(headers, expected);

        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0], format!("https://example.com/jobs/{}", i + 1));
            assert_eq!(row[1], format!("2024-06-0{}", i + 1));
            assert_eq!(row[2], format!("Title for https://example.com/jobs/{}", i + 1));
            assert_eq!(row.last().unwrap(), "2024-06-15");
        }
        let column = |name: &str| headers.iter().position(|h| h == name).unwrap();

        // "<p>Lead" is one token and misses the "lead" prefix; "supportive"
        // is feminine-coded; one <li>; two distinct sentences.
        for (name, expected) in [
            ("masculine_word_count", "0"),
            ("feminine_word_count", "1"),
            ("bullet_point_count", "1"),
            ("count_of_duplicate_sentences", "0"),
        ] {
            let idx = column(name);
            assert!(rows.iter().all(|r| r[idx] == expected), "{name}");
        }

        for name in [
            "jd_structure_eval",
            "salary_compliance",
            "jd_text_eval",
            "cx_eval_1",
            "cx_eval_2",
            "cx_eval_3",
            "cx_eval_4",
            "cx_eval_5",
        ] {
            let idx = column(name);
            assert!(rows.iter().all(|r| r[idx] == DEV_MODE_PLACEHOLDER), "{name}");
        }
        // Language check without credentials leaves its columns empty.
        let grammar = column("grammar_mistakes");
        assert!(rows.iter().all(|r| r[grammar].is_empty()));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_skipped_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let visited = Arc::new(Mutex::new(Vec::new()));
        let broken = "https://example.com/jobs/2";
        let summary = ReportSession::new(backend(entries(), &[broken], visited), &ctx)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.skipped, vec![broken.to_string()]);
        let skipped_file = summary.skipped_file.unwrap();
        assert_eq!(
            std::fs::read_to_string(skipped_file).unwrap(),
            format!("url\n{broken}\n")
        );

        // Row for posting 3 carries posting 3's manifest date.
        let (_, rows) = read_csv(&summary.merged_table);
        assert_eq!(rows[1][0], "https://example.com/jobs/3");
        assert_eq!(rows[1][1], "2024-06-03");
    }

    #[tokio::test]
    async fn test_resume_skips_processed_records_and_keeps_their_rows() {
        let dir = tempfile::tempdir().unwrap();

        // First run dies after posting 2: simulate by processing a 2-entry manifest.
        let first_visits = Arc::new(Mutex::new(Vec::new()));
        let ctx = context(dir.path(), false);
        ReportSession::new(backend(entries()[..2].to_vec(), &[], first_visits), &ctx)
            .run()
            .await
            .unwrap();

        let resumed_visits = Arc::new(Mutex::new(Vec::new()));
        let ctx = context(dir.path(), true);
        let summary = ReportSession::new(backend(entries(), &[], resumed_visits.clone()), &ctx)
            .run()
            .await
            .unwrap();

        assert_eq!(
            *resumed_visits.lock().unwrap(),
            vec!["https://example.com/jobs/3".to_string()]
        );
        assert_eq!(summary.rows, 3);
        let (_, rows) = read_csv(&summary.merged_table);
        let urls: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/jobs/1",
                "https://example.com/jobs/2",
                "https://example.com/jobs/3"
            ]
        );
    }

    #[tokio::test]
    async fn test_resume_from_final_checkpoint_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let first = ReportSession::new(backend(entries(), &[], Arc::default()), &ctx)
            .run()
            .await
            .unwrap();
        let first_csv = std::fs::read_to_string(&first.merged_table).unwrap();

        let visits = Arc::new(Mutex::new(Vec::new()));
        let ctx = context(dir.path(), true);
        let second = ReportSession::new(backend(entries(), &[], visits.clone()), &ctx)
            .run()
            .await
            .unwrap();

        assert!(visits.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&second.merged_table).unwrap(), first_csv);
    }

    #[tokio::test]
    async fn test_checkpoint_url_missing_from_manifest_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        CheckpointStore::new(dir.path())
            .save("https://example.com/jobs/404", &[])
            .unwrap();

        let visits = Arc::new(Mutex::new(Vec::new()));
        let ctx = context(dir.path(), true);
        let summary = ReportSession::new(backend(entries(), &[], visits.clone()), &ctx)
            .run()
            .await
            .unwrap();
        assert!(visits.lock().unwrap().is_empty());
        assert_eq!(summary.rows, 0);
        let (headers, rows) = read_csv(&summary.merged_table);
        assert_eq!(headers[0], "url");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), false);
        let backend = Backend::new(
            "fake_scraper",
            Box::new(FailingManifest),
            Box::new(FakeExtractor {
                broken: HashSet::new(),
                visited: Arc::default(),
            }),
            Box::new(NoAugmentation),
        );
        let err = ReportSession::new(backend, &ctx).run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Discovery { .. }));
        assert!(!dir
            .path()
            .join("fake_scraper_merged_table_2024-06-15.csv")
            .exists());
    }

    #[tokio::test]
    async fn test_checkpoint_from_other_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        CheckpointStore::new(dir.path())
            .save("https://example.com/jobs/1", &[vec![serde_json::json!("x")]])
            .unwrap();
        let ctx = context(dir.path(), true);
        let err = ReportSession::new(backend(entries(), &[], Arc::default()), &ctx)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
