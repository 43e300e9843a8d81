use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::Result,
    model::{DiseaseDefinition, Question},
};

/// Progress through one disease's questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Questionnaire {
    pub disease_id: String,
    pub disease: DiseaseDefinition,
    pub current_index: usize,
    pub answers: Vec<String>,
}

impl Questionnaire {
    pub fn new(disease_id: impl Into<String>, disease: DiseaseDefinition) -> Self {
        Self {
            disease_id: disease_id.into(),
            disease,
            current_index: 0,
            answers: Vec::new(),
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.disease.assessment_questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions().get(self.current_index)
    }

    pub fn total_questions(&self) -> usize {
        self.questions().len()
    }

    /// Stores the answer for the current question and advances the cursor.
    pub fn record_answer(&mut self, answer: impl Into<String>) {
        self.answers.push(answer.into());
        self.current_index += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.total_questions()
    }
}

/// Conversation mode of a session.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    WaitingForSymptom,
    AnsweringQuestions(Questionnaire),
}

/// Session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            state: SessionState::WaitingForSymptom,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_waiting_for_symptom(&self) -> bool {
        matches!(self.state, SessionState::WaitingForSymptom)
    }

    /// Drops any questionnaire in progress.
    pub fn reset(&mut self) {
        self.state = SessionState::WaitingForSymptom;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes sessions not updated within `max_idle`. Returns how many were dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = TimeDelta::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };

        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.updated_at >= cutoff);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.sessions.len(), "idle sessions evicted");
        }
        evicted
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
