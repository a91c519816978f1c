//! Resume state: the last URL fully processed and every row produced so far.
//!
//! Two JSON files in one directory:
//!   checkpoint.json       {"last_scraped": "<url>"}
//!   data_checkpoint.json  {"payload": [[...row...], ...]}
//!
//! Both are overwritten after every successful record. The write is not
//! atomic; a crash mid-write can leave a truncated file, which `load`
//! reports as a persistence error instead of guessing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ScrapeError;
use crate::models::FinalRow;

pub const URL_CHECKPOINT_FILE: &str = "checkpoint.json";
pub const DATA_CHECKPOINT_FILE: &str = "data_checkpoint.json";

#[derive(Debug, Serialize, Deserialize)]
struct UrlCheckpoint {
    last_scraped: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataCheckpoint {
    payload: Option<Vec<FinalRow>>,
}

#[derive(Serialize)]
struct DataCheckpointRef<'a> {
    payload: &'a [FinalRow],
}

/// What a previous run left behind. Empty when there was nothing to load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    pub last_scraped_url: Option<String>,
    pub rows: Vec<FinalRow>,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn url_path(&self) -> PathBuf {
        self.dir.join(URL_CHECKPOINT_FILE)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_CHECKPOINT_FILE)
    }

    /// Records `url` as the last completed posting along with all rows.
    pub fn save(&self, url: &str, rows: &[FinalRow]) -> Result<(), ScrapeError> {
        write_json(
            &self.url_path(),
            &UrlCheckpoint {
                last_scraped: Some(url.to_string()),
            },
        )?;
        write_json(&self.data_path(), &DataCheckpointRef { payload: rows })?;
        debug!("Checkpoint saved at {url} ({} rows)", rows.len());
        Ok(())
    }

    /// Missing files mean a fresh start; unreadable ones are an error.
    pub fn load(&self) -> Result<Checkpoint, ScrapeError> {
        let url: Option<UrlCheckpoint> = read_json(&self.url_path())?;
        let data: Option<DataCheckpoint> = read_json(&self.data_path())?;

        let checkpoint = Checkpoint {
            last_scraped_url: url.and_then(|u| u.last_scraped),
            rows: data.and_then(|d| d.payload).unwrap_or_default(),
        };
        if checkpoint.last_scraped_url.is_some() && checkpoint.rows.is_empty() {
            warn!(
                "Checkpoint names a last URL but {} holds no rows",
                self.data_path().display()
            );
        }
        Ok(checkpoint)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ScrapeError> {
    let bytes = serde_json::to_vec(value).map_err(|e| ScrapeError::persistence(path, e))?;
    std::fs::write(path, bytes).map_err(|e| ScrapeError::persistence(path, e))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, ScrapeError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ScrapeError::persistence(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| ScrapeError::persistence(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<FinalRow> {
        vec![
            vec![json!("https://example.com/jobs/1"), json!("SRE"), json!(3), json!(null)],
            vec![json!("https://example.com/jobs/2"), json!("PM"), json!(0), json!({"Spelling mistake": 1})],
        ]
    }

    #[test]
    fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert_eq!(store.load().unwrap(), Checkpoint::default());
    }

    #[test]
    fn test_save_then_load_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save("https://example.com/jobs/2", &rows()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.last_scraped_url.as_deref(), Some("https://example.com/jobs/2"));
        assert_eq!(loaded.rows, rows());
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save("https://example.com/jobs/1", &rows()[..1]).unwrap();

        let url: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.url_path()).unwrap()).unwrap();
        assert_eq!(url, json!({"last_scraped": "https://example.com/jobs/1"}));
        let data: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.data_path()).unwrap()).unwrap();
        assert_eq!(data["payload"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_checkpoint_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        std::fs::write(store.url_path(), "{\"last_scraped\": ").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, ScrapeError::Persistence { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("does/not/exist"));
        assert!(matches!(
            store.save("https://example.com/jobs/1", &rows()),
            Err(ScrapeError::Persistence { .. })
        ));
    }
}
