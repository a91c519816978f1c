// Per-posting analysis: deterministic text metrics plus external evaluation.
// All completion calls go through llm_client; no direct HTTP here.

pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod text;
