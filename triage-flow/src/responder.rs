//! Small talk for input that names no known symptom.
//!
//! The intent catalogue is plain JSON: intents are tried in order and a
//! pattern matches either the whole cleaned input or a word-bounded phrase in
//! it. The catalogue also carries the fallback prompts and emergency phrases.

use rand::{Rng, seq::SliceRandom};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::Result;

const BUILTIN_CATALOGUE: &str = include_str!("../data/intents.json");

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Catalogue {
    intents: Vec<Intent>,
    #[serde(default)]
    fallback_replies: Vec<String>,
    #[serde(default)]
    emergency_phrases: Vec<String>,
}

/// A matched intent and the response picked for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralReply {
    pub intent: String,
    pub response: String,
}

struct CompiledIntent {
    name: String,
    patterns: Vec<(String, Regex)>,
    responses: Vec<String>,
}

pub struct GeneralResponder {
    intents: Vec<CompiledIntent>,
    fallback_replies: Vec<String>,
    emergency_phrases: Vec<String>,
}

impl GeneralResponder {
    /// The catalogue bundled with the crate.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_CATALOGUE).expect("bundled intent catalogue is valid")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let catalogue: Catalogue = serde_json::from_str(raw)?;
        let intents = catalogue
            .intents
            .into_iter()
            .filter_map(compile_intent)
            .collect::<Vec<_>>();
        debug!(intents = intents.len(), "general intents loaded");

        Ok(Self {
            intents,
            fallback_replies: catalogue.fallback_replies,
            emergency_phrases: catalogue
                .emergency_phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        })
    }

    /// Name of the first intent matching the input.
    pub fn match_intent(&self, text: &str) -> Option<&str> {
        self.find(text).map(|intent| intent.name.as_str())
    }

    pub fn respond(&self, text: &str) -> Option<GeneralReply> {
        self.respond_with(text, &mut rand::thread_rng())
    }

    pub fn respond_with<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Option<GeneralReply> {
        let intent = self.find(text)?;
        let response = intent.responses.choose(rng)?.clone();
        debug!(intent = %intent.name, "general intent matched");
        Some(GeneralReply {
            intent: intent.name.clone(),
            response,
        })
    }

    /// A prompt suggesting example symptoms.
    pub fn fallback_reply(&self) -> String {
        self.fallback_reply_with(&mut rand::thread_rng())
    }

    pub fn fallback_reply_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.fallback_replies
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "Tell me a symptom such as fever, headache or cough.".to_string())
    }

    /// Whether the text mentions an emergency phrase.
    pub fn is_emergency(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.emergency_phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    }

    fn find(&self, text: &str) -> Option<&CompiledIntent> {
        let clean = clean_text(text);
        if clean.is_empty() {
            return None;
        }

        let found = self.intents.iter().find(|intent| {
            intent
                .patterns
                .iter()
                .any(|(pattern, regex)| clean == *pattern || regex.is_match(&clean))
        });
        if found.is_none() {
            debug!(input = %clean, "no general intent match");
        }
        found
    }
}

fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(spaced.trim(), " ").to_string()
}

fn compile_intent(intent: Intent) -> Option<CompiledIntent> {
    if intent.responses.is_empty() {
        warn!(intent = %intent.intent, "skipping intent without responses");
        return None;
    }

    let patterns = intent
        .patterns
        .iter()
        .map(|p| p.to_lowercase())
        .filter(|p| !p.trim().is_empty())
        .filter_map(|pattern| {
            RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&pattern)))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|regex| (pattern, regex))
        })
        .collect();

    Some(CompiledIntent {
        name: intent.intent,
        patterns,
        responses: intent.responses,
    })
}
