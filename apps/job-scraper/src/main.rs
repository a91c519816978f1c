mod analysis;
mod backends;
mod cli;
mod config;
mod errors;
mod html;
mod langtools;
mod llm_client;
mod models;
mod report;
mod retry;
mod scraping;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::evaluation::Evaluator;
use crate::analysis::pipeline::AnalysisPipeline;
use crate::backends::{build_backend, BackendOptions};
use crate::cli::Cli;
use crate::config::Config;
use crate::langtools::LanguageToolClient;
use crate::llm_client::{CompletionService, DevModeCompletion, LlmClient};
use crate::report::checkpoint::CheckpointStore;
use crate::report::session::ReportSession;
use crate::retry::RetryPolicy;
use crate::state::{RunContext, RunOptions};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("\n❌ Error during scraping: {e}");
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env(cli.dev_mode)?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let name = cli.scraper_type.name();
    info!("{}", "=".repeat(60));
    info!("Job scraper v{}", env!("CARGO_PKG_VERSION"));
    info!("Initializing {name} scraper");
    info!("Dev mode: {}", if cli.dev_mode { "ON" } else { "OFF" });
    info!("{}", "=".repeat(60));

    let completion: Arc<dyn CompletionService> = if cli.dev_mode {
        info!("Completion calls disabled (dev mode)");
        Arc::new(DevModeCompletion)
    } else {
        let key = config
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY is required outside dev mode")?;
        let llm = LlmClient::new(key, config.openai_model.clone())?;
        info!("LLM client initialized (model: {})", llm.model());
        Arc::new(llm)
    };

    if config.lang_tools.is_none() {
        warn!("LANG_TOOLS_UNAME / LANG_TOOLS_API_KEY not set; grammar columns will be empty");
    }
    let language = Arc::new(LanguageToolClient::new(config.lang_tools.clone())?);

    let evaluator = Evaluator::new(completion, RetryPolicy::completion(), name);
    let run_date = chrono::Local::now().date_naive();
    let ctx = RunContext::new(
        RunOptions {
            dev_mode: cli.dev_mode,
            lookback_days: cli.lookback,
            resume: cli.checkpoint,
            output_dir: cli.output_dir.clone(),
            run_date,
        },
        CheckpointStore::new(cli.checkpoint_dir.clone()),
        AnalysisPipeline::new(language, evaluator),
    );

    let backend = build_backend(
        cli.scraper_type,
        &BackendOptions {
            lookback_days: ctx.options.lookback_days,
            today: run_date,
        },
    )?;

    let summary = ReportSession::new(backend, &ctx).run().await?;

    info!("{}", "=".repeat(60));
    info!("✅ Scraping completed successfully!");
    info!(
        "{} postings discovered, {} rows exported",
        summary.discovered, summary.rows
    );
    info!("Filename: {}", summary.merged_table.display());
    if let Some(skipped) = &summary.skipped_file {
        warn!(
            "⚠️ Skipped {} URLs, listed in {}",
            summary.skipped.len(),
            skipped.display()
        );
    }
    info!("{}", "=".repeat(60));

    Ok(())
}
