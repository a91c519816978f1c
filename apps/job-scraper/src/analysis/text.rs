//! Deterministic text metrics over a job description.
//!
//! Gendered-word and bullet counts read the raw HTML on purpose; sentence
//! duplication reads the normalized text.

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::html::{text_blocks, EMPHASIS_TAGS};

/// Prefixes of masculine-coded words (after Gaucher, Friesen & Kay, 2011).
const MASCULINE_PREFIXES: &[&str] = &[
    "active",
    "adventurous",
    "aggress",
    "ambitio",
    "analy",
    "assert",
    "athlet",
    "autonom",
    "boast",
    "challeng",
    "compet",
    "confident",
    "courag",
    "decisive",
    "determin",
    "dominan",
    "driven",
    "fearless",
    "force",
    "greedy",
    "headstrong",
    "hierarch",
    "hostil",
    "impulsive",
    "independen",
    "individual",
    "intellect",
    "lead",
    "logic",
    "masculine",
    "objective",
    "opinion",
    "outspoken",
    "persist",
    "principle",
    "reckless",
    "self-confiden",
    "self-relian",
    "self-sufficien",
    "stubborn",
    "superior",
    "unreasonab",
];

/// Prefixes of feminine-coded words (after Gaucher, Friesen & Kay, 2011).
const FEMININE_PREFIXES: &[&str] = &[
    "affectionate",
    "cheer",
    "collab",
    "commit",
    "communal",
    "compassion",
    "connect",
    "considerate",
    "cooperat",
    "co-operat",
    "depend",
    "emotiona",
    "empath",
    "feel",
    "flatterable",
    "gentle",
    "honest",
    "interpersonal",
    "interdependen",
    "kind",
    "kinship",
    "loyal",
    "modesty",
    "nag",
    "nurtur",
    "pleasant",
    "polite",
    "quiet",
    "respon",
    "sensitiv",
    "submissive",
    "support",
    "sympath",
    "tender",
    "together",
    "trust",
    "understand",
    "warm",
    "whin",
    "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderCoding {
    Masculine,
    Feminine,
}

impl GenderCoding {
    fn prefixes(self) -> &'static [&'static str] {
        match self {
            GenderCoding::Masculine => MASCULINE_PREFIXES,
            GenderCoding::Feminine => FEMININE_PREFIXES,
        }
    }
}

/// Flattens description HTML to plain text for the text-level steps:
/// emphasis unwrapped, one line per block.
pub fn normalize_description(description_html: &str) -> String {
    text_blocks(description_html, EMPHASIS_TAGS).join("\n")
}

/// Counts whitespace-delimited tokens starting with any coded prefix,
/// case-insensitively. Runs on the raw description, markup included.
pub fn gendered_word_count(text: &str, coding: GenderCoding) -> u32 {
    let lowered = text.to_lowercase();
    let prefixes = coding.prefixes();
    lowered
        .split_whitespace()
        .filter(|word| prefixes.iter().any(|p| word.starts_with(p)))
        .count() as u32
}

/// Number of `<li>` markers, computed as the length lost when they are
/// removed divided by the marker length. Attributed `<li class=..>` tags do
/// not count.
pub fn count_bullets(raw_html: &str) -> u32 {
    ((raw_html.len() - raw_html.replace("<li>", "").len()) / 4) as u32
}

/// Sentences minus distinct sentences, using Unicode sentence boundaries.
pub fn count_duplicate_sentences(text: &str) -> u32 {
    let sentences: Vec<&str> = text
        .unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let distinct: HashSet<&str> = sentences.iter().copied().collect();
    (sentences.len() - distinct.len()) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gendered_count_is_case_insensitive() {
        let lower = gendered_word_count("Leadership opportunity", GenderCoding::Masculine);
        let upper = gendered_word_count("LEADERSHIP opportunity", GenderCoding::Masculine);
        assert_eq!(lower, 1);
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_gendered_counts_are_independent() {
        let text = "A competitive, supportive team that trusts you to lead.";
        assert_eq!(gendered_word_count(text, GenderCoding::Masculine), 2);
        assert_eq!(gendered_word_count(text, GenderCoding::Feminine), 2);
    }

    #[test]
    fn test_gendered_count_misses_words_glued_to_markup() {
        // Tokens are split on whitespace only; "<p>Lead" does not start with "lead".
        assert_eq!(
            gendered_word_count("<p>Lead the team</p>", GenderCoding::Masculine),
            0
        );
        assert_eq!(
            gendered_word_count("<p> Lead the team</p>", GenderCoding::Masculine),
            1
        );
    }

    #[test]
    fn test_count_bullets_matches_marker_count() {
        assert_eq!(count_bullets("<ul><li>One</li><li>Two</li><li>Three</li></ul>"), 3);
        assert_eq!(count_bullets("<p>No list here</p>"), 0);
        assert_eq!(count_bullets(""), 0);
    }

    #[test]
    fn test_count_bullets_ignores_attributed_items() {
        assert_eq!(count_bullets("<ul><li class=\"x\">One</li><li>Two</li></ul>"), 1);
    }

    #[test]
    fn test_no_duplicates_when_sentences_distinct() {
        assert_eq!(
            count_duplicate_sentences("We build tools. You ship features. Everyone learns."),
            0
        );
    }

    #[test]
    fn test_repeated_sentence_counts_extra_copies() {
        let text = "Apply now. Great team. Apply now. Good pay. Apply now.";
        assert_eq!(count_duplicate_sentences(text), 2);
    }

    #[test]
    fn test_duplicates_across_blocks() {
        let text = normalize_description("<p>Apply now.</p><p>Apply now.</p><p>Remote friendly.</p>");
        assert_eq!(count_duplicate_sentences(&text), 1);
    }

    #[test]
    fn test_normalize_description_unwraps_emphasis() {
        let html = "<div><p>Join <strong>our</strong> team.</p><ul><li>Rust</li><li>SQL</li></ul></div>";
        assert_eq!(normalize_description(html), "Join our team.\nRust\nSQL");
    }
}
