//! Command-line surface for one scraping run.

use std::path::PathBuf;

use clap::Parser;

use crate::backends::BackendKind;

/// Scrape a career site, analyze every posting and export a merged CSV.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "job-scraper",
    version,
    about = "Scrape and analyze job descriptions from a career site"
)]
pub struct Cli {
    /// Which site backend to run
    #[arg(short = 's', long, env = "JOB_SCRAPER_TYPE", value_enum)]
    pub scraper_type: BackendKind,

    /// Skip paid completion calls and fill evaluations with a placeholder
    #[arg(short = 'd', long, env = "JOB_SCRAPER_DEV_MODE", default_value_t = false)]
    pub dev_mode: bool,

    /// Days of postings to include, for date-windowed backends
    #[arg(short = 'l', long, env = "JOB_SCRAPER_LOOKBACK", default_value_t = 14)]
    pub lookback: i64,

    /// Resume from checkpoint.json / data_checkpoint.json
    #[arg(long, env = "JOB_SCRAPER_CHECKPOINT", default_value_t = false)]
    pub checkpoint: bool,

    /// Directory for the merged table and skipped-URL list
    #[arg(long, env = "JOB_SCRAPER_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Directory holding the checkpoint files
    #[arg(long, env = "JOB_SCRAPER_CHECKPOINT_DIR", default_value = ".")]
    pub checkpoint_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["job-scraper", "-s", "basic_xpath_scraper"]).unwrap();
        assert_eq!(cli.scraper_type, BackendKind::BasicXpath);
        assert!(!cli.dev_mode);
        assert_eq!(cli.lookback, 14);
        assert!(!cli.checkpoint);
        assert_eq!(cli.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "job-scraper",
            "--scraper-type",
            "session_api_scraper",
            "-d",
            "-l",
            "30",
            "--checkpoint",
            "--output-dir",
            "/tmp/reports",
        ])
        .unwrap();
        assert_eq!(cli.scraper_type, BackendKind::SessionApi);
        assert!(cli.dev_mode);
        assert_eq!(cli.lookback, 30);
        assert!(cli.checkpoint);
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["job-scraper", "-s", "workday_scraper"]).is_err());
    }
}
