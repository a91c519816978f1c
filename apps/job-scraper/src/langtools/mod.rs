//! Grammar and spelling check via the LanguageTool Plus API.
//!
//! Matches are bucketed by category. Anything LanguageTool flags as a
//! spelling problem or a possible typo lands in `SPELLING_CATEGORY`; every
//! other match counts under its rule category name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

const LANGTOOLS_API_URL: &str = "https://api.languagetoolplus.com/v2/check";

/// Whitespace rules are noise for text recovered from HTML.
const DISABLED_RULES: &str = "WHITESPACE_RULE, SENTENCE_WHITESPACE, SPACE_BEFORE_FINAL_PUNCTUATION_MARK, \
    CONSECUTIVE_SPACES, CURRENCY_SPACE, COMMA_PARENTHESIS_WHITESPACE, APOS_SPACE_CONTRACTION";

pub const SPELLING_CATEGORY: &str = "Spelling mistake";
const SPELLING_SHORT_MESSAGES: &[&str] = &["Official spelling", "Spelling mistake"];
const TYPO_CATEGORY: &str = "Possible Typo";

#[derive(Debug, Error)]
pub enum LangCheckError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Language check credentials are not configured")]
    NotConfigured,
}

/// Issue counts per category for one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageReport {
    pub language: String,
    pub issues: BTreeMap<String, u32>,
}

impl LanguageReport {
    pub fn spelling_mistakes(&self) -> u32 {
        self.issues.get(SPELLING_CATEGORY).copied().unwrap_or(0)
    }

    pub fn grammar_mistakes(&self) -> u32 {
        self.issues
            .iter()
            .filter(|(category, _)| category.as_str() != SPELLING_CATEGORY)
            .map(|(_, count)| count)
            .sum()
    }
}

/// The language-check capability consumed by the analysis pipeline.
#[async_trait]
pub trait LanguageChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<LanguageReport, LangCheckError>;
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    language: CheckLanguage,
    #[serde(default)]
    matches: Vec<CheckMatch>,
}

#[derive(Debug, Deserialize)]
struct CheckLanguage {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckMatch {
    #[serde(default)]
    short_message: String,
    rule: CheckRule,
}

#[derive(Debug, Deserialize)]
struct CheckRule {
    category: CheckCategory,
}

#[derive(Debug, Deserialize)]
struct CheckCategory {
    name: String,
}

#[derive(Clone)]
pub struct LanguageToolClient {
    client: Client,
    credentials: Option<(String, String)>,
}

impl LanguageToolClient {
    /// `credentials` is `(username, api_key)`; without them every check
    /// fails with `NotConfigured` and the pipeline nulls the grammar columns.
    pub fn new(credentials: Option<(String, String)>) -> Result<Self, LangCheckError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            credentials,
        })
    }
}

#[async_trait]
impl LanguageChecker for LanguageToolClient {
    async fn check(&self, text: &str) -> Result<LanguageReport, LangCheckError> {
        let (username, api_key) = self
            .credentials
            .as_ref()
            .ok_or(LangCheckError::NotConfigured)?;

        let form = [
            ("text", text),
            ("language", "auto"),
            ("username", username.as_str()),
            ("apiKey", api_key.as_str()),
            ("disabledRules", DISABLED_RULES),
        ];

        let response = self.client.post(LANGTOOLS_API_URL).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LangCheckError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body = response.text().await?;
        parse_check_response(&body)
    }
}

fn parse_check_response(body: &str) -> Result<LanguageReport, LangCheckError> {
    let payload: CheckResponse = serde_json::from_str(body)?;
    let mut issues: BTreeMap<String, u32> = BTreeMap::new();

    for m in &payload.matches {
        let category = if SPELLING_SHORT_MESSAGES.contains(&m.short_message.as_str())
            || m.rule.category.name == TYPO_CATEGORY
        {
            SPELLING_CATEGORY.to_string()
        } else {
            m.rule.category.name.clone()
        };
        *issues.entry(category).or_insert(0) += 1;
    }

    Ok(LanguageReport {
        language: payload.language.name,
        issues,
    })
}
