use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;

/// Secrets and service settings loaded from the environment (and `.env`).
/// The completion key is only required outside dev mode.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// `(username, api_key)` for the grammar service, when both are set.
    pub lang_tools: Option<(String, String)>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env(dev_mode: bool) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let openai_api_key = if dev_mode {
            optional_env("OPENAI_API_KEY")
        } else {
            Some(require_env("OPENAI_API_KEY")?)
        };

        let lang_tools = match (
            optional_env("LANG_TOOLS_UNAME"),
            optional_env("LANG_TOOLS_API_KEY"),
        ) {
            (Some(user), Some(key)) => Some((user, key)),
            _ => None,
        };

        Ok(Config {
            openai_api_key,
            openai_model: optional_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            lang_tools,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
