// Evaluation prompt sets. Each prompt is submitted on its own, so a failure
// only nulls its own column.

/// Which prompt set a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSet {
    /// Prompts run for every backend.
    Base,
    /// Candidate experience: prompts geared toward talent attraction.
    CandidateExperience,
}

/// A single evaluation prompt and the report column it fills.
#[derive(Debug, Clone, Copy)]
pub struct EvalPrompt {
    pub column: &'static str,
    pub prompt: &'static str,
}

pub const BASE_PROMPTS: &[EvalPrompt] = &[
    EvalPrompt {
        column: "jd_structure_eval",
        prompt: "Evaluate the structure of this job description. Does it clearly separate \
            an introduction, responsibilities, requirements and benefits? \
            Answer in at most three sentences.",
    },
    EvalPrompt {
        column: "salary_compliance",
        prompt: "Does this job description state a salary or pay range? \
            Answer 'Yes' or 'No', followed by the range if one is given.",
    },
    EvalPrompt {
        column: "jd_text_eval",
        prompt: "Assess the readability and tone of this job description. \
            Point out jargon, overly long sentences or exclusionary phrasing. \
            Answer in at most three sentences.",
    },
];

pub const CANDIDATE_EXPERIENCE_PROMPTS: &[EvalPrompt] = &[
    EvalPrompt {
        column: "cx_eval_1",
        prompt: "After reading this, do you understand what you would do day to day? \
            Answer in at most two sentences.",
    },
    EvalPrompt {
        column: "cx_eval_2",
        prompt: "Which requirements feel essential and which feel optional? \
            Answer in at most two sentences.",
    },
    EvalPrompt {
        column: "cx_eval_3",
        prompt: "Does the posting tell you anything about the team or the culture \
            you would be joining? Answer in at most two sentences.",
    },
    EvalPrompt {
        column: "cx_eval_4",
        prompt: "Is anything in the posting likely to discourage you from applying? \
            Answer in at most two sentences.",
    },
    EvalPrompt {
        column: "cx_eval_5",
        prompt: "On a scale from 1 to 10, how likely are you to apply? \
            Reply with the number and one sentence of reasoning.",
    },
];

impl PromptSet {
    pub fn prompts(self) -> &'static [EvalPrompt] {
        match self {
            PromptSet::Base => BASE_PROMPTS,
            PromptSet::CandidateExperience => CANDIDATE_EXPERIENCE_PROMPTS,
        }
    }

    /// System message carrying the raw description for this prompt set.
    pub fn system_message(self, job_description: &str) -> String {
        match self {
            PromptSet::Base => format!("Consider this job description: {job_description}"),
            PromptSet::CandidateExperience => format!(
                "You are a job candidate reviewing a job description for an open role. \
                Consider the following job description: {job_description}"
            ),
        }
    }
}
