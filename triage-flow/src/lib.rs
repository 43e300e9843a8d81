pub mod condition;
pub mod error;
pub mod flow;
pub mod matcher;
pub mod model;
pub mod responder;
pub mod rules;
pub mod runner;
pub mod source;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use condition::{Condition, build_user_condition, normalize_condition};
pub use error::{Result, TriageError};
pub use flow::{ExecutionResult, ExecutionStatus, QuestionPrompt, Reply, TriageFlow};
pub use matcher::KeywordMatcher;
pub use model::{
    CareGuidelines, DiseaseDefinition, DoctorConsultation, KeywordEntry, Medicine, Question,
    Severity, TriageResult, TriageStatus,
};
pub use responder::{GeneralReply, GeneralResponder};
pub use rules::evaluate_rules;
pub use runner::FlowRunner;
#[cfg(feature = "http")]
pub use source::HttpDiseaseSource;
pub use source::{DiseaseSource, FsDiseaseSource, InMemoryDiseaseSource};
pub use storage::{InMemorySessionStorage, Questionnaire, Session, SessionState, SessionStorage};
pub use validation::{ensure_valid_questions, validate_questions};
