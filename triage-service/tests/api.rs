use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use tower::ServiceExt;
use triage_service::{Config, create_app};

async fn app() -> Router {
    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data");
    let config = Config::from_vars(|key| match key {
        "TRIAGE_DATA_DIR" => Some(data_dir.display().to_string()),
        _ => None,
    })
    .unwrap();
    create_app(&config).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    assert!(response.headers().contains_key("x-correlation-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn chat(app: &Router, session_id: Option<&str>, content: &str) -> (StatusCode, Value) {
    let mut body = json!({ "content": content });
    if let Some(id) = session_id {
        body["session_id"] = json!(id);
    }
    send(app, Method::POST, "/chat", Some(body)).await
}

#[tokio::test]
async fn health_reports_status_and_timestamp() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn chat_runs_a_fever_assessment() {
    let app = app().await;

    let (status, first) = chat(&app, None, "I have a fever").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "awaiting_answer");
    assert_eq!(first["reply"]["kind"], "question");
    assert_eq!(first["reply"]["question_index"], 0);
    assert_eq!(first["emergency"], false);
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (_, session) = send(&app, Method::GET, &format!("/session/{session_id}"), None).await;
    assert_eq!(session["state"]["mode"], "ANSWERING_QUESTIONS");
    assert_eq!(session["state"]["disease_id"], "fever");

    for answer in ["Between 100.4°F and 102°F", "More than 3 days", "No"] {
        let (_, body) = chat(&app, Some(&session_id), answer).await;
        assert_eq!(body["status"], "awaiting_answer");
    }

    let (status, last) = chat(&app, Some(&session_id), "None").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["status"], "completed");
    assert_eq!(last["reply"]["kind"], "result");
    assert_eq!(last["reply"]["severity"], "moderate");
    assert_eq!(last["reply"]["status"], "success");
    assert!(last["reply"]["care"]["self_care"].is_array());

    let (_, session) = send(&app, Method::GET, &format!("/session/{session_id}"), None).await;
    assert_eq!(session["state"]["mode"], "WAITING_FOR_SYMPTOM");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app().await;

    let (status, body) = chat(&app, Some("no-such-session"), "hello").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["session_id"], "no-such-session");

    let (status, _) = send(&app, Method::GET, "/session/no-such-session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_ends_the_session() {
    let app = app().await;
    let (_, first) = chat(&app, None, "hello").await;
    let session_id = first["session_id"].as_str().unwrap().to_string();
    assert_eq!(first["status"], "waiting_for_symptom");
    assert_eq!(first["reply"]["kind"], "prompt");

    let uri = format!("/session/{session_id}");
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_content_gets_a_prompt() {
    let app = app().await;
    let (status, body) = send(&app, Method::POST, "/chat", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "waiting_for_symptom");
    assert!(body["reply"]["text"].is_string());
}

#[tokio::test]
async fn emergency_phrases_are_flagged() {
    let app = app().await;
    let (status, body) = chat(&app, None, "I have severe chest pain").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emergency"], true);
}

#[tokio::test]
async fn missing_definition_is_reported_in_band() {
    let app = app().await;
    let (status, body) = chat(&app, None, "my throat pain is awful").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"]["aborted"].is_string());
    assert!(body["reply"]["text"].as_str().unwrap().contains("Sore Throat"));
}

#[tokio::test]
async fn sweeper_drops_idle_sessions() {
    use std::{sync::Arc, time::Duration};
    use triage_flow::{InMemorySessionStorage, Session, SessionStorage};
    use triage_service::spawn_session_sweeper;

    let storage = Arc::new(InMemorySessionStorage::new());
    let mut stale = Session::new("stale");
    stale.updated_at = chrono::Utc::now() - chrono::TimeDelta::hours(1);
    storage.save(stale).await.unwrap();

    let sweeper = spawn_session_sweeper(storage.clone(), Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(500)).await;
    sweeper.abort();

    assert!(storage.get("stale").await.unwrap().is_none());
    assert!(storage.is_empty());
}
