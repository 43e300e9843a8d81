//! FlowRunner – loads a session, runs exactly **one** conversation turn and
//! persists the updated session back to storage.
//!
//! Create one runner at startup and share it across requests:
//! ```rust,ignore
//! let runner = FlowRunner::new(flow, storage);
//! let session_id = runner.start().await?;
//! let result = runner.run(&session_id, "I have a fever").await?;
//! ```
//!
//! Turn failures are already folded into the [`ExecutionResult`]; only
//! storage errors and unknown session ids are returned as `Err`.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{Result, TriageError},
    flow::{ExecutionResult, TriageFlow},
    storage::{Session, SessionStorage},
};

/// High-level helper that orchestrates the _load → handle → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    flow: Arc<TriageFlow>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(flow: Arc<TriageFlow>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { flow, storage }
    }

    pub fn flow(&self) -> &TriageFlow {
        &self.flow
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Stores a fresh session and returns its id.
    pub async fn start(&self) -> Result<String> {
        let session = Session::new(Uuid::new_v4().to_string());
        let id = session.id.clone();
        self.storage.save(session).await?;
        debug!(session_id = %id, "session created");
        Ok(id)
    }

    /// Handle one message for `session_id` and persist the new state.
    pub async fn run(&self, session_id: &str, input: &str) -> Result<ExecutionResult> {
        // 1. Load session
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| TriageError::SessionNotFound(session_id.to_string()))?;

        // 2. Exactly one turn
        let result = self.flow.handle(&mut session, input).await;

        // 3. Persist so the next call continues where this one stopped
        self.storage.save(session).await?;

        Ok(result)
    }

    /// Drops the session; unknown ids are ignored.
    pub async fn end(&self, session_id: &str) -> Result<()> {
        self.storage.delete(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flow::{ExecutionStatus, Reply},
        model::KeywordEntry,
        source::InMemoryDiseaseSource,
        storage::InMemorySessionStorage,
    };

    async fn runner() -> FlowRunner {
        let source = InMemoryDiseaseSource::new(vec![KeywordEntry {
            disease_id: "fever".into(),
            keywords: vec!["fever".into()],
        }]);
        let flow = TriageFlow::from_source(Arc::new(source)).await;
        FlowRunner::new(Arc::new(flow), Arc::new(InMemorySessionStorage::new()))
    }

    #[tokio::test]
    async fn start_creates_uuid_sessions() {
        let runner = runner().await;
        let id = runner.start().await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(runner.storage().get(&id).await.unwrap().is_some());
        assert_ne!(id, runner.start().await.unwrap());
    }

    #[tokio::test]
    async fn run_requires_existing_session() {
        let runner = runner().await;
        assert!(matches!(
            runner.run("missing", "hi").await,
            Err(TriageError::SessionNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn run_persists_session_state() {
        let runner = runner().await;
        let id = runner.start().await.unwrap();
        let before = runner.storage().get(&id).await.unwrap().unwrap();

        // Definition is missing, so the turn aborts and the session stays waiting.
        let result = runner.run(&id, "fever").await.unwrap();
        assert!(matches!(result.status, ExecutionStatus::Aborted(_)));
        assert!(matches!(result.reply, Reply::Prompt { .. }));

        let after = runner.storage().get(&id).await.unwrap().unwrap();
        assert!(after.is_waiting_for_symptom());
        assert!(after.updated_at >= before.updated_at);

        runner.end(&id).await.unwrap();
        assert!(runner.storage().get(&id).await.unwrap().is_none());
    }
}
