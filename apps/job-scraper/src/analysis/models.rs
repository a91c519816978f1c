use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Column names of the universal analysis row, in export order.
pub const BASE_HEADERS: &[&str] = &[
    "url",
    "title",
    "job_desc",
    "job_info_raw",
    "masculine_word_count",
    "feminine_word_count",
    "grammar_mistakes",
    "spelling_mistakes",
    "langtools_detail",
    "bullet_point_count",
    "count_of_duplicate_sentences",
    "jd_structure_eval",
    "salary_compliance",
    "jd_text_eval",
    "cx_eval_1",
    "cx_eval_2",
    "cx_eval_3",
    "cx_eval_4",
    "cx_eval_5",
];

/// Evaluation answers keyed by column; `None` when that prompt failed.
pub type Evaluations = BTreeMap<&'static str, Option<String>>;

/// Result of the language-check step. All three are null together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageFindings {
    pub grammar_mistakes: Option<u32>,
    pub spelling_mistakes: Option<u32>,
    pub detail: Option<BTreeMap<String, u32>>,
}

/// The fixed analysis row for one posting.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseAnalysisResult {
    pub url: String,
    pub title: String,
    pub job_desc: String,
    pub job_info_raw: Option<String>,
    pub masculine_word_count: u32,
    pub feminine_word_count: u32,
    pub language: LanguageFindings,
    pub bullet_point_count: u32,
    pub count_of_duplicate_sentences: u32,
    pub evaluations: Evaluations,
}

impl BaseAnalysisResult {
    pub fn evaluation(&self, column: &str) -> Option<&str> {
        self.evaluations.get(column).and_then(|v| v.as_deref())
    }

    /// Values in `BASE_HEADERS` order.
    pub fn into_values(self) -> Vec<Value> {
        let eval = |column: &str| -> Value {
            self.evaluations
                .get(column)
                .cloned()
                .flatten()
                .map(Value::String)
                .unwrap_or(Value::Null)
        };
        let mut values = vec![
            Value::String(self.url.clone()),
            Value::String(self.title.clone()),
            Value::String(self.job_desc.clone()),
            self.job_info_raw.clone().map(Value::String).unwrap_or(Value::Null),
            json!(self.masculine_word_count),
            json!(self.feminine_word_count),
            json!(self.language.grammar_mistakes),
            json!(self.language.spelling_mistakes),
            json!(self.language.detail),
            json!(self.bullet_point_count),
            json!(self.count_of_duplicate_sentences),
        ];
        values.extend(BASE_HEADERS[11..].iter().map(|column| eval(column)));
        values
    }
}
