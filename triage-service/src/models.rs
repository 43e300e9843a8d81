use serde::{Deserialize, Serialize};
use triage_flow::{ExecutionResult, ExecutionStatus, Reply};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a new session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: Reply,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    /// The message mentioned an emergency phrase.
    pub emergency: bool,
}

impl ChatResponse {
    pub fn new(session_id: String, result: ExecutionResult, emergency: bool) -> Self {
        Self {
            session_id,
            reply: result.reply,
            status: result.status,
            diagnostics: result.diagnostics,
            emergency,
        }
    }
}
