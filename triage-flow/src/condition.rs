//! Turning questionnaire answers into a condition record.
//!
//! A condition maps a stable field id to an answer. Field ids come from the
//! question `id`, then its `type`, then a content sniffing table, and finally
//! a positional `q<N>` label. Normalization canonicalizes the values the rule
//! engine compares against.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::model::Question;

/// Field id to answer.
pub type Condition = BTreeMap<String, String>;

/// A field id derivation rule: every group must have at least one term
/// contained in the lower-cased question text.
struct FieldRule {
    label: &'static str,
    groups: &'static [&'static [&'static str]],
}

/// Evaluated top to bottom, first match wins.
const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        label: "temperature",
        groups: &[&["temperature", "fever reading"]],
    },
    FieldRule {
        label: "duration_days",
        groups: &[&["day", "duration"], &["last", "how long", "how many"]],
    },
    FieldRule {
        label: "vomiting",
        groups: &[&["vomit"]],
    },
    FieldRule {
        label: "other_symptoms",
        groups: &[&["other symptom", "additional symptom"]],
    },
    FieldRule {
        label: "pain_level",
        groups: &[&["pain"], &["level", "severity"]],
    },
    FieldRule {
        label: "pain_location",
        groups: &[&["pain"], &["where"]],
    },
    FieldRule {
        label: "cough_type",
        groups: &[&["cough"], &["type"]],
    },
    FieldRule {
        label: "screen_time",
        groups: &[&["screen"]],
    },
    FieldRule {
        label: "triggers",
        groups: &[&["trigger"]],
    },
    FieldRule {
        label: "acidity_severity",
        groups: &[&["burning", "acidity"]],
    },
    FieldRule {
        label: "food_timing",
        groups: &[&["food", "eat"]],
    },
];

impl FieldRule {
    fn matches(&self, text: &str) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|term| text.contains(term)))
    }
}

/// Derives a field id from question text; `index` is the 0-based position.
pub fn derive_field_id(question: &str, index: usize) -> String {
    let text = question.to_lowercase();
    FIELD_RULES
        .iter()
        .find(|rule| rule.matches(&text))
        .map(|rule| rule.label.to_string())
        .unwrap_or_else(|| format!("q{}", index + 1))
}

/// Field id used for the question at `index`.
pub fn field_id(question: &Question, index: usize) -> String {
    question
        .explicit_key()
        .map(str::to_string)
        .unwrap_or_else(|| derive_field_id(&question.question, index))
}

/// Pairs questions with their positional answers. Missing answers are empty.
///
/// When two questions resolve to the same field id the later answer replaces
/// the earlier one.
pub fn build_user_condition(questions: &[Question], answers: &[String]) -> Condition {
    let mut condition = Condition::new();
    for (index, question) in questions.iter().enumerate() {
        let key = field_id(question, index);
        let answer = answers.get(index).cloned().unwrap_or_default();
        debug!(field = %key, answer = %answer, "mapped answer");
        if let Some(previous) = condition.insert(key.clone(), answer) {
            warn!(field = %key, index, previous = %previous, "duplicate field id, earlier answer replaced");
        }
    }
    condition
}

pub fn normalize_condition(condition: &Condition) -> Condition {
    condition
        .iter()
        .map(|(key, value)| (key.clone(), normalize_answer(value, key)))
        .collect()
}

/// Canonicalizes one answer for the given field id.
pub fn normalize_answer(answer: &str, field_id: &str) -> String {
    if answer.is_empty() {
        return String::new();
    }

    let normalized = answer.trim().to_lowercase();
    let original = || answer.trim().to_string();

    if field_id == "temperature" {
        if normalized.contains("100.4") && normalized.contains("102") {
            return "100.4-102°F".to_string();
        }
        if normalized.contains(">102") || normalized.contains("above 102") {
            return ">102°F".to_string();
        }
        if normalized.contains("<100.4") || normalized.contains("below 100") {
            return "<100.4°F".to_string();
        }
        return original();
    }

    if field_id.contains("duration") {
        if normalized.contains("<2") || normalized.contains("less than 2") {
            return "<2".to_string();
        }
        if normalized.contains("2-3") || normalized.contains("2 to 3") {
            return "2-3".to_string();
        }
        if normalized.contains(">3") || normalized.contains("more than 3") {
            return ">3".to_string();
        }
        return original();
    }

    if field_id == "vomiting" {
        if normalized.contains("no") || normalized == "none" {
            return "no".to_string();
        }
        if normalized.contains("occasional") || normalized.contains("sometimes") {
            return "occasional".to_string();
        }
        if normalized.contains("persistent") || normalized.contains("frequent") {
            return "persistent".to_string();
        }
        return original();
    }

    if field_id == "pain_level" {
        if normalized.contains("mild") || normalized.contains("1-3") {
            return "mild".to_string();
        }
        if normalized.contains("moderate") || normalized.contains("4-7") {
            return "moderate".to_string();
        }
        if normalized.contains("severe") || normalized.contains("8-10") {
            return "severe".to_string();
        }
        return original();
    }

    if answer.contains(',') {
        return answer
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
    }

    normalized
}
