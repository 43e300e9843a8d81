//! Conversation state machine.
//!
//! A session is either waiting for a symptom or working through the
//! questionnaire of one disease. Each call to [`TriageFlow::handle`] processes
//! exactly one user message and produces exactly one [`Reply`]. Failures never
//! escape a turn: they become a notice, the session is reset and the status is
//! [`ExecutionStatus::Aborted`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    condition::build_user_condition,
    error::{Result, TriageError},
    matcher::KeywordMatcher,
    model::{DiseaseDefinition, TriageResult},
    responder::GeneralResponder,
    rules::evaluate_rules,
    source::DiseaseSource,
    storage::{Questionnaire, Session, SessionState},
    validation::ensure_valid_disease,
};

/// A question ready to be shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPrompt {
    pub question_text: String,
    pub options: Vec<String>,
    pub is_multi_select: bool,
    /// 0-based position in the questionnaire.
    pub question_index: usize,
    pub total_questions: usize,
}

/// What the assistant says back for one turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Prompt { text: String },
    Question(QuestionPrompt),
    Result(TriageResult),
}

impl Reply {
    pub fn prompt(text: impl Into<String>) -> Self {
        Reply::Prompt { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// No questionnaire in progress.
    WaitingForSymptom,
    /// A question was presented and needs an answer.
    AwaitingAnswer,
    /// A triage result was produced and the session reset.
    Completed,
    /// The turn failed; the session was reset.
    Aborted(String),
}

/// Result of one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub reply: Reply,
    pub status: ExecutionStatus,
    /// Question-set validation messages when a definition was rejected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl ExecutionResult {
    fn new(reply: Reply, status: ExecutionStatus) -> Self {
        Self {
            reply,
            status,
            diagnostics: Vec::new(),
        }
    }
}

pub struct TriageFlow {
    matcher: Arc<KeywordMatcher>,
    responder: Arc<GeneralResponder>,
    source: Arc<dyn DiseaseSource>,
}

impl TriageFlow {
    pub fn new(
        matcher: Arc<KeywordMatcher>,
        responder: Arc<GeneralResponder>,
        source: Arc<dyn DiseaseSource>,
    ) -> Self {
        Self {
            matcher,
            responder,
            source,
        }
    }

    /// Builds a flow whose keyword matcher is loaded from `source`.
    ///
    /// A keyword dataset that cannot be loaded leaves the matcher empty, so
    /// every message falls through to small talk.
    pub async fn from_source(source: Arc<dyn DiseaseSource>) -> Self {
        let matcher = match source.keywords().await {
            Ok(entries) => KeywordMatcher::new(entries),
            Err(e) => {
                warn!(error = %e, "keyword dataset unavailable, symptom detection disabled");
                KeywordMatcher::empty()
            }
        };
        info!(diseases = matcher.len(), "triage flow ready");
        Self::new(
            Arc::new(matcher),
            Arc::new(GeneralResponder::builtin()),
            source,
        )
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    pub fn responder(&self) -> &GeneralResponder {
        &self.responder
    }

    /// Processes one user message against `session`.
    pub async fn handle(&self, session: &mut Session, input: &str) -> ExecutionResult {
        let state = std::mem::take(&mut session.state);
        let result = match state {
            SessionState::WaitingForSymptom => self.on_symptom(session, input).await,
            SessionState::AnsweringQuestions(questionnaire) => {
                self.on_answer(session, questionnaire, input)
            }
        };
        session.touch();
        result
    }

    async fn on_symptom(&self, session: &mut Session, input: &str) -> ExecutionResult {
        if input.trim().is_empty() {
            return self.fallback();
        }

        if let Some(disease_id) = self.matcher.detect_disease(input) {
            info!(session_id = %session.id, disease_id, "symptom detected");
            let disease_id = disease_id.to_string();
            return self.start_questionnaire(session, &disease_id).await;
        }

        match self.responder.respond(input) {
            Some(reply) => ExecutionResult::new(
                Reply::prompt(reply.response),
                ExecutionStatus::WaitingForSymptom,
            ),
            None => self.fallback(),
        }
    }

    async fn start_questionnaire(&self, session: &mut Session, disease_id: &str) -> ExecutionResult {
        let disease = match self.load_disease(disease_id).await {
            Ok(disease) => disease,
            Err(e) => return self.abort(session, disease_id, e),
        };
        info!(
            session_id = %session.id,
            disease = %disease.name,
            questions = disease.assessment_questions.len(),
            "questionnaire started"
        );

        let questionnaire = Questionnaire::new(disease_id, disease);
        self.next_step(session, questionnaire)
    }

    async fn load_disease(&self, disease_id: &str) -> Result<DiseaseDefinition> {
        let disease = self.source.disease(disease_id).await?;
        ensure_valid_disease(&disease)?;
        Ok(disease)
    }

    fn on_answer(
        &self,
        session: &mut Session,
        mut questionnaire: Questionnaire,
        input: &str,
    ) -> ExecutionResult {
        let answer = input.trim();
        if answer.is_empty() {
            debug!(session_id = %session.id, "blank answer, repeating question");
            return self.next_step(session, questionnaire);
        }

        debug!(
            session_id = %session.id,
            index = questionnaire.current_index,
            answer,
            "answer recorded"
        );
        questionnaire.record_answer(answer);
        self.next_step(session, questionnaire)
    }

    /// Presents the current question, or evaluates once none are left.
    fn next_step(&self, session: &mut Session, questionnaire: Questionnaire) -> ExecutionResult {
        match question_prompt(&questionnaire) {
            Some(prompt) => {
                session.state = SessionState::AnsweringQuestions(questionnaire);
                ExecutionResult::new(Reply::Question(prompt), ExecutionStatus::AwaitingAnswer)
            }
            None => {
                let condition =
                    build_user_condition(questionnaire.questions(), &questionnaire.answers);
                let result = evaluate_rules(&condition, &questionnaire.disease);
                info!(
                    session_id = %session.id,
                    disease_id = %questionnaire.disease_id,
                    severity = %result.severity,
                    "triage completed"
                );
                session.reset();
                ExecutionResult::new(Reply::Result(result), ExecutionStatus::Completed)
            }
        }
    }

    fn fallback(&self) -> ExecutionResult {
        ExecutionResult::new(
            Reply::prompt(self.responder.fallback_reply()),
            ExecutionStatus::WaitingForSymptom,
        )
    }

    fn abort(&self, session: &mut Session, disease_id: &str, err: TriageError) -> ExecutionResult {
        error!(session_id = %session.id, disease_id, error = %err, "questionnaire aborted");
        session.reset();

        let name = format_name(disease_id);
        let (text, diagnostics) = match &err {
            TriageError::DataUnavailable(_) => (
                format!(
                    "Sorry, I don't have information for \"{name}\" yet. Available symptoms: {}",
                    self.available_symptoms()
                ),
                Vec::new(),
            ),
            TriageError::InvalidDiseaseData(_) => (
                format!("Sorry, the information for \"{name}\" is incomplete. Please try another symptom."),
                Vec::new(),
            ),
            TriageError::InvalidQuestions(errors) => (
                format!("Sorry, the questions for \"{name}\" could not be loaded. Please try another symptom."),
                errors.clone(),
            ),
            _ => (
                "Unable to complete analysis. Please try again or consult a healthcare professional."
                    .to_string(),
                Vec::new(),
            ),
        };

        ExecutionResult {
            reply: Reply::prompt(text),
            status: ExecutionStatus::Aborted(err.to_string()),
            diagnostics,
        }
    }

    fn available_symptoms(&self) -> String {
        let names = self
            .matcher
            .disease_ids()
            .map(|id| id.replace('_', " "))
            .collect::<Vec<_>>();
        if names.is_empty() {
            "none loaded".to_string()
        } else {
            names.join(", ")
        }
    }
}

fn question_prompt(questionnaire: &Questionnaire) -> Option<QuestionPrompt> {
    let question = questionnaire.current_question()?;
    Some(QuestionPrompt {
        question_text: question.question.clone(),
        options: question.options.clone(),
        is_multi_select: question.is_multi_select(),
        question_index: questionnaire.current_index,
        total_questions: questionnaire.total_questions(),
    })
}

/// `sore_throat` -> `Sore Throat`
fn format_name(disease_id: &str) -> String {
    disease_id
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
