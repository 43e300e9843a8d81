use thiserror::Error;

/// Errors produced while loading triage data or driving a session.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("invalid disease data: {0}")]
    InvalidDiseaseData(String),

    #[error("invalid question set: {}", .0.join("; "))]
    InvalidQuestions(Vec<String>),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
