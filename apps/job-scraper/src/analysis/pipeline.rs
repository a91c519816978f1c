//! Analysis pipeline: one extracted record in, one base analysis row out.
//!
//! Flow: normalize → gendered counts → bullets → duplicate sentences →
//!       language check → LLM evaluation.
//!
//! No step can discard the row. The language check and the evaluations
//! degrade to null columns when their service fails.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::analysis::evaluation::Evaluator;
use crate::analysis::models::{BaseAnalysisResult, LanguageFindings};
use crate::analysis::text::{
    count_bullets, count_duplicate_sentences, gendered_word_count, normalize_description,
    GenderCoding,
};
use crate::langtools::{LangCheckError, LanguageChecker};
use crate::models::RawRecord;

pub struct AnalysisPipeline {
    language: Arc<dyn LanguageChecker>,
    evaluator: Evaluator,
}

impl AnalysisPipeline {
    pub fn new(language: Arc<dyn LanguageChecker>, evaluator: Evaluator) -> Self {
        Self {
            language,
            evaluator,
        }
    }

    pub async fn analyze(&self, url: &str, raw: &RawRecord) -> BaseAnalysisResult {
        let normalized = normalize_description(&raw.description);
        debug!("Normalized description for {url}: {} chars", normalized.len());

        let language = match self.check_language(&normalized).await {
            Ok(findings) => findings,
            Err(e) => {
                warn!("{e}; continuing analysis without language check");
                LanguageFindings::default()
            }
        };

        let evaluations = self.evaluator.evaluate_all(&raw.description).await;

        BaseAnalysisResult {
            url: url.to_string(),
            title: raw.title.clone(),
            job_desc: raw.description.clone(),
            job_info_raw: raw.meta.clone(),
            masculine_word_count: gendered_word_count(&raw.description, GenderCoding::Masculine),
            feminine_word_count: gendered_word_count(&raw.description, GenderCoding::Feminine),
            language,
            bullet_point_count: count_bullets(&raw.description),
            count_of_duplicate_sentences: count_duplicate_sentences(&normalized),
            evaluations,
        }
    }

    async fn check_language(&self, text: &str) -> Result<LanguageFindings, LangCheckError> {
        let report = self.language.check(text).await?;
        Ok(LanguageFindings {
            grammar_mistakes: Some(report.grammar_mistakes()),
            spelling_mistakes: Some(report.spelling_mistakes()),
            detail: Some(report.issues),
        })
    }
}
