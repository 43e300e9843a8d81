//! Keyword based disease detection.
//!
//! Every keyword of the dataset is compiled once into a whole-word,
//! case-insensitive pattern where internal whitespace matches any whitespace
//! run. A disease scores one point per matching keyword and the strictly
//! highest score wins; on a tie the entry seen first in the dataset is kept.

use regex::{NoExpand, Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::{error::Result, model::KeywordEntry};

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,/#!$%^&*;:{}=\-_`~()]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

struct KeywordPattern {
    keyword: String,
    regex: Regex,
}

struct CompiledEntry {
    disease_id: String,
    patterns: Vec<KeywordPattern>,
}

/// Immutable matcher over the keyword dataset.
pub struct KeywordMatcher {
    entries: Vec<CompiledEntry>,
}

impl KeywordMatcher {
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        let entries: Vec<CompiledEntry> = entries
            .into_iter()
            .map(|entry| {
                let patterns = entry
                    .keywords
                    .iter()
                    .filter_map(|keyword| compile_keyword(&entry.disease_id, keyword))
                    .collect();
                CompiledEntry {
                    disease_id: entry.disease_id,
                    patterns,
                }
            })
            .collect();

        info!(diseases = entries.len(), "keyword matcher ready");
        Self { entries }
    }

    /// A matcher that never detects anything. Used when the dataset failed to load.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses the keyword dataset: a JSON object mapping arbitrary keys to
    /// `{ disease_id, keywords }`. Entry order follows the document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self::new(parse_keyword_dataset(raw)?))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Known disease ids in dataset order.
    pub fn disease_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.disease_id.as_str())
    }

    /// Returns the best matching disease id for the given free text.
    pub fn detect_disease(&self, user_input: &str) -> Option<&str> {
        if self.entries.is_empty() {
            warn!("keywords not loaded, cannot detect disease");
            return None;
        }

        let normalized = normalize_input(user_input);
        debug!(input = %normalized, "analyzing input");

        let mut best_match: Option<&str> = None;
        let mut highest_score = 0usize;

        for entry in &self.entries {
            let mut score = 0usize;
            for pattern in &entry.patterns {
                if pattern.regex.is_match(&normalized) {
                    score += 1;
                    debug!(keyword = %pattern.keyword, disease_id = %entry.disease_id, "keyword matched");
                }
            }

            if score > highest_score {
                highest_score = score;
                best_match = Some(&entry.disease_id);
            }
        }

        debug!(best_match = ?best_match, score = highest_score, "detection finished");
        best_match
    }
}

/// Parses the keyword dataset document into entries, keeping document order.
pub fn parse_keyword_dataset(raw: &str) -> Result<Vec<KeywordEntry>> {
    let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    document
        .into_iter()
        .map(|(_, value)| serde_json::from_value(value).map_err(Into::into))
        .collect()
}

/// Lower-cases, replaces punctuation with spaces and collapses whitespace.
pub fn normalize_input(input: &str) -> String {
    let lowered = input.to_lowercase();
    let spaced = PUNCTUATION.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

fn compile_keyword(disease_id: &str, keyword: &str) -> Option<KeywordPattern> {
    let lowered = keyword.to_lowercase();
    if lowered.trim().is_empty() {
        warn!(disease_id, "skipping blank keyword");
        return None;
    }

    let escaped = regex::escape(&lowered);
    let flexible = WHITESPACE.replace_all(&escaped, NoExpand(r"\s+"));
    match RegexBuilder::new(&format!(r"\b{flexible}\b"))
        .case_insensitive(true)
        .build()
    {
        Ok(regex) => Some(KeywordPattern {
            keyword: keyword.to_string(),
            regex,
        }),
        Err(e) => {
            warn!(disease_id, keyword, error = %e, "skipping keyword that does not compile");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, keywords: &[&str]) -> KeywordEntry {
        KeywordEntry {
            disease_id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn normalizes_punctuation_and_whitespace() {
        assert_eq!(normalize_input("  I have a FEVER!!  (since-Monday) "), "i have a fever since monday");
        assert_eq!(normalize_input("what's up?"), "what's up?");
    }

    #[test]
    fn detects_single_keyword() {
        let matcher = KeywordMatcher::new(vec![entry("fever", &["fever", "high temperature"])]);
        assert_eq!(matcher.detect_disease("I have a fever"), Some("fever"));
        assert_eq!(matcher.detect_disease("nothing relevant"), None);
    }

    #[test]
    fn keyword_must_match_whole_word() {
        let matcher = KeywordMatcher::new(vec![entry("greeting", &["yo"])]);
        assert_eq!(matcher.detect_disease("you there"), None);
        assert_eq!(matcher.detect_disease("yo there"), Some("greeting"));
    }

    #[test]
    fn multi_word_keyword_tolerates_spacing_and_punctuation() {
        let matcher = KeywordMatcher::new(vec![entry("sore_throat", &["sore throat"])]);
        assert_eq!(matcher.detect_disease("my SORE    throat hurts"), Some("sore_throat"));
        assert_eq!(matcher.detect_disease("sore-throat since yesterday"), Some("sore_throat"));
        assert_eq!(matcher.detect_disease("sorethroat"), None);
    }

    #[test]
    fn highest_score_wins() {
        let matcher = KeywordMatcher::new(vec![
            entry("headache", &["head", "migraine"]),
            entry("fever", &["fever", "hot", "chills"]),
        ]);
        assert_eq!(matcher.detect_disease("fever and chills, my head hurts"), Some("fever"));
    }

    #[test]
    fn ties_keep_first_seen_entry() {
        let matcher = KeywordMatcher::new(vec![
            entry("cold", &["runny nose"]),
            entry("fever", &["fever"]),
        ]);
        assert_eq!(matcher.detect_disease("fever with a runny nose"), Some("cold"));
    }

    #[test]
    fn regex_characters_in_keywords_are_literal() {
        let matcher = KeywordMatcher::new(vec![entry("odd", &["a.b"])]);
        assert_eq!(matcher.detect_disease("axb"), None);
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let matcher = KeywordMatcher::new(vec![entry("broken", &["", "   "])]);
        assert_eq!(matcher.detect_disease("anything at all"), None);
    }

    #[test]
    fn empty_matcher_never_detects() {
        let matcher = KeywordMatcher::empty();
        assert!(matcher.is_empty());
        assert_eq!(matcher.detect_disease("fever"), None);
    }

    #[test]
    fn detection_is_deterministic() {
        let matcher = KeywordMatcher::new(vec![
            entry("cough", &["cough", "dry cough"]),
            entry("cold", &["cold", "sneezing"]),
        ]);
        let first = matcher.detect_disease("dry cough and a cold").map(str::to_string);
        for _ in 0..10 {
            assert_eq!(matcher.detect_disease("dry cough and a cold").map(str::to_string), first);
        }
        assert_eq!(first.as_deref(), Some("cough"));
    }

    #[test]
    fn dataset_keeps_document_order() {
        let raw = r#"{
            "zeta": {"disease_id": "fever", "keywords": ["fever"]},
            "alpha": {"disease_id": "cold", "keywords": ["fever"]}
        }"#;
        let matcher = KeywordMatcher::from_json(raw).unwrap();
        assert_eq!(matcher.disease_ids().collect::<Vec<_>>(), vec!["fever", "cold"]);
        assert_eq!(matcher.detect_disease("fever"), Some("fever"));
    }

    #[test]
    fn malformed_dataset_is_an_error() {
        assert!(KeywordMatcher::from_json("[1, 2, 3]").is_err());
        assert!(KeywordMatcher::from_json("not json").is_err());
    }
}
