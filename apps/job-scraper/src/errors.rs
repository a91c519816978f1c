use std::path::PathBuf;

use thiserror::Error;

/// Application-level error type for one scraping run.
///
/// Only `Discovery`, `Persistence`, `Export` and `Config` ever escape a run.
/// `Extraction` skips one record. Analysis failures never get this far: each
/// step nulls its own columns.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Discovery failed for {backend}: {message}")]
    Discovery { backend: String, message: String },

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Checkpoint error at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn discovery(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn extraction(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for errors that abort the run instead of skipping a record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::Discovery { .. }
                | ScrapeError::Persistence { .. }
                | ScrapeError::Export(_)
                | ScrapeError::Config(_)
        )
    }
}

impl From<csv::Error> for ScrapeError {
    fn from(e: csv::Error) -> Self {
        ScrapeError::Export(e.to_string())
    }
}
