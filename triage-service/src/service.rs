use axum::{
    Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use triage_flow::{
    FlowRunner, FsDiseaseSource, InMemorySessionStorage, Session, SessionStorage, TriageError,
    TriageFlow,
};

use crate::{
    config::Config,
    models::{ChatRequest, ChatResponse},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

const CORRELATION_HEADER: &str = "x-correlation-id";
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn runner_error(err: TriageError, session_id: &str) -> ApiError {
    match err {
        TriageError::SessionNotFound(_) => not_found_error("Session not found", session_id),
        other => {
            error!(session_id = %session_id, error = %other, "session turn failed");
            internal_error("Failed to process message", &other.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runner: FlowRunner,
}

impl AppState {
    pub fn new(flow: Arc<TriageFlow>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            runner: FlowRunner::new(flow, storage),
        }
    }
}

/// Builds the application from `config`; disease data is read from its data directory.
pub async fn create_app(config: &Config) -> Router {
    let source = Arc::new(FsDiseaseSource::new(config.data_dir.clone()));
    let flow = TriageFlow::from_source(source).await;
    if flow.matcher().is_empty() {
        warn!(data_dir = %config.data_dir.display(), "no symptom keywords loaded");
    }

    let storage = Arc::new(InMemorySessionStorage::new());
    spawn_session_sweeper(storage.clone(), config.session_ttl);

    let state = AppState::new(Arc::new(flow), storage);
    build_router(state)
}

/// Periodically drops sessions idle for longer than `ttl`.
pub fn spawn_session_sweeper(
    storage: Arc<InMemorySessionStorage>,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = ttl.min(MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = storage.evict_idle(ttl);
            if evicted > 0 {
                info!(evicted, remaining = storage.len(), "Idle sessions evicted");
            }
        }
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/session/{id}", get(get_session).delete(delete_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Tags each request with a correlation id and runs it inside an `http_request` span.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = header.clone() {
        request.headers_mut().insert(CORRELATION_HEADER, value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    info!(
        session_id = ?request.session_id,
        content_length = request.content.len(),
        "Processing chat message"
    );

    let session_id = match request.session_id {
        Some(id) => id,
        None => state.runner.start().await.map_err(|e| {
            error!(error = %e, "Failed to create session");
            internal_error("Failed to create session", &e.to_string())
        })?,
    };

    let result = state
        .runner
        .run(&session_id, &request.content)
        .await
        .map_err(|e| runner_error(e, &session_id))?;

    let emergency = state.runner.flow().responder().is_emergency(&request.content);
    if emergency {
        warn!(session_id = %session_id, "emergency phrase in message");
    }

    info!(session_id = %session_id, status = ?result.status, "Chat turn completed");
    Ok(Json(ChatResponse::new(session_id, result, emergency)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Session> {
    match state.runner.storage().get(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(not_found_error("Session not found", &session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.runner.end(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Failed to delete session");
        internal_error("Failed to delete session", &e.to_string())
    })?;
    info!(session_id = %session_id, "Session ended");
    Ok(StatusCode::NO_CONTENT)
}
