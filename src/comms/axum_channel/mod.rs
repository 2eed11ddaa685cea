//! HTTP JSON channel built on axum. Each client creates its own session and
//! drives it turn by turn; sessions never see each other's state.
//!
//! ```text
//! GET    /api/health
//! POST   /api/sessions                          → new session at the menu
//! GET    /api/sessions/{id}                     → stage, transcript, slots
//! DELETE /api/sessions/{id}
//! POST   /api/sessions/{id}/messages            {"message": "..."}
//! DELETE /api/sessions/{id}/transcript
//! POST   /api/sessions/{id}/menu
//! PUT    /api/sessions/{id}/slots/{name}        any JSON value
//! POST   /api/sessions/{id}/flashcards/search   {"query": "...", "k": 3}
//! ```

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};

use super::state::{CommsEvent, CommsState};

/// Router state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub(crate) struct AxumState {
    pub channel_id: Arc<str>,
    pub comms: Arc<CommsState>,
}

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<CommsState>,
}

impl AxumChannel {
    pub fn new(channel_id: impl Into<String>, bind_addr: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), bind_addr: bind_addr.into(), state }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.state, shutdown))
    }
}

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    comms: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(AxumState { channel_id: Arc::from(channel_id.as_str()), comms: comms.clone() });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("http bind failed on {bind_addr}: {e}")))?;
    info!(%channel_id, %bind_addr, "http channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("http server error: {e}")))?;

    info!(%channel_id, "http channel shut down");
    comms.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

pub(crate) fn build_router(state: AxumState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/{id}", get(api::session_detail).delete(api::delete_session))
        .route("/api/sessions/{id}/messages", post(api::message))
        .route("/api/sessions/{id}/transcript", delete(api::clear_transcript))
        .route("/api/sessions/{id}/menu", post(api::return_to_menu))
        .route("/api/sessions/{id}/slots/{name}", put(api::set_slot))
        .route("/api/sessions/{id}/flashcards/search", post(api::search_flashcards))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::assistant::{AssistantSettings, MENU_TEXT, StudyAssistant};
    use crate::config::Config;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::search::WebSearchProvider;
    use crate::search::providers::dummy::DummySearch;

    fn router_with(llm: DummyProvider) -> Router {
        let settings = AssistantSettings::from_config(&Config::test_default());
        let assistant =
            StudyAssistant::new(LlmProvider::Dummy(llm), WebSearchProvider::Dummy(DummySearch::new()), settings);
        let (tx, _rx) = mpsc::channel(64);
        build_router(AxumState { channel_id: Arc::from("http-test"), comms: Arc::new(CommsState::new(assistant, tx)) })
    }

    fn router() -> Router {
        router_with(DummyProvider::new(16))
    }

    async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn create(router: &Router) -> String {
        let (status, body) = call(router, Method::POST, "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn say(router: &Router, id: &str, message: &str) -> (StatusCode, Value) {
        call(router, Method::POST, &format!("/api/sessions/{id}/messages"), Some(json!({ "message": message }))).await
    }

    #[tokio::test]
    async fn health_reports_providers() {
        let r = router();
        let (status, body) = call(&r, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["llm"], "dummy");
        assert_eq!(body["search"], "dummy");
    }

    #[tokio::test]
    async fn new_session_starts_at_menu() {
        let r = router();
        let (_, body) = call(&r, Method::POST, "/api/sessions", None).await;
        assert_eq!(body["stage"], "main_menu");
        assert_eq!(body["transcript"][0]["content"], MENU_TEXT);
    }

    #[tokio::test]
    async fn summarize_flow_over_http() {
        let r = router();
        let id = create(&r).await;
        let (status, body) = say(&r, &id, "2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], json!({ "kind": "menu_selected", "stage": "summarize" }));

        let (status, body) = say(&r, &id, "Mitochondria make ATP.").await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"], "Summarizing Text...");

        let (_, detail) = call(&r, Method::GET, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(detail["stage"], "summarize");
        assert_eq!(detail["transcript"].as_array().unwrap().len(), 6);
        assert_eq!(detail["slots"]["turn_count"], 2);
    }

    #[tokio::test]
    async fn collaborator_failure_is_bad_gateway() {
        let r = router_with(DummyProvider::new(16).failing());
        let id = create(&r).await;
        say(&r, &id, "3").await;
        let (status, body) = say(&r, &id, "some text").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "collaborator_unavailable");
        let messages = body["messages"].as_array().unwrap();
        assert!(messages.last().unwrap()["content"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_turn_times_out_with_error_message() {
        let r = router_with(DummyProvider::new(16).with_latency(Duration::from_secs(600)));
        let id = create(&r).await;
        say(&r, &id, "2").await;
        let (status, body) = say(&r, &id, "Mitochondria make ATP.").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "timeout");
        assert_eq!(body["stage"], "summarize");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], "Mitochondria make ATP.");
        assert_eq!(messages[1]["content"], "Summarizing Text...");
        assert!(messages[2]["content"].as_str().unwrap().starts_with("Error: "));

        let (_, detail) = call(&r, Method::GET, &format!("/api/sessions/{id}"), None).await;
        let transcript = detail["transcript"].as_array().unwrap();
        assert!(transcript.last().unwrap()["content"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn sessions_do_not_share_state() {
        let r = router();
        let a = create(&r).await;
        let b = create(&r).await;
        say(&r, &a, "1").await;
        let (_, detail) = call(&r, Method::GET, &format!("/api/sessions/{b}"), None).await;
        assert_eq!(detail["stage"], "main_menu");
    }

    #[tokio::test]
    async fn menu_clear_and_slots() {
        let r = router();
        let id = create(&r).await;
        say(&r, &id, "4").await;

        let (_, body) = call(&r, Method::POST, &format!("/api/sessions/{id}/menu"), None).await;
        assert_eq!(body["stage"], "main_menu");
        assert_eq!(body["messages"][0]["content"], MENU_TEXT);

        let (_, body) = call(&r, Method::DELETE, &format!("/api/sessions/{id}/transcript"), None).await;
        assert_eq!(body["transcript"], json!([]));
        assert_eq!(body["stage"], "main_menu");

        let uri = format!("/api/sessions/{id}/slots/quiz_score");
        let (_, body) = call(&r, Method::PUT, &uri, Some(json!(7))).await;
        assert_eq!(body["previous"], Value::Null);
        let (_, body) = call(&r, Method::PUT, &uri, Some(json!(9))).await;
        assert_eq!(body["previous"], 7);
    }

    #[tokio::test]
    async fn flashcard_search_returns_stored_cards() {
        let r = router_with(DummyProvider::new(16).with_reply("Q: What is H2O? A: Water."));
        let id = create(&r).await;
        say(&r, &id, "1").await;
        let (_, body) = say(&r, &id, "chemistry notes").await;
        assert_eq!(body["messages"][3]["content"], "Stored 1 flashcard(s) in the local index.");

        let uri = format!("/api/sessions/{id}/flashcards/search");
        let (status, body) = call(&r, Method::POST, &uri, Some(json!({ "query": "water", "k": 5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([{ "question": "What is H2O?", "answer": "Water." }]));
    }

    #[tokio::test]
    async fn unknown_and_deleted_sessions_are_not_found() {
        let r = router();
        let missing = uuid::Uuid::new_v4();
        let (status, body) = call(&r, Method::GET, &format!("/api/sessions/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let id = create(&r).await;
        let (status, _) = call(&r, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = say(&r, &id, "1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
