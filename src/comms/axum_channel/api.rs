//! Handlers for the `/api/*` routes.

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assistant::{Message, SessionState};
use crate::comms::state::SharedSession;
use crate::error::AppError;

use super::AxumState;

/// Upper bound on one assistant turn, collaborator calls included.
const TURN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
}

#[derive(Deserialize)]
pub(super) struct FlashcardSearchRequest {
    query: String,
    k: Option<usize>,
}

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn session_view(id: Uuid, s: &SessionState) -> Value {
    json!({
        "session_id": id,
        "stage": s.stage(),
        "transcript": s.transcript(),
        "slots": s.slots(),
        "flashcards": s.flashcards().len(),
    })
}

fn error_status(e: &AppError) -> (StatusCode, &'static str) {
    match e {
        AppError::CollaboratorUnavailable(_) => (StatusCode::BAD_GATEWAY, "collaborator_unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

async fn lookup(state: &AxumState, id: &Uuid) -> Result<SharedSession, Response> {
    state.comms.session(id).await.ok_or_else(|| {
        (StatusCode::NOT_FOUND, json_error("not_found", format!("no session {id}"))).into_response()
    })
}

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let assistant = state.comms.assistant();
    Json(json!({
        "status": "ok",
        "llm": assistant.llm_name(),
        "search": assistant.search_name(),
        "sessions": state.comms.session_count().await,
    }))
    .into_response()
}

/// POST /api/sessions
pub(super) async fn create_session(State(state): State<AxumState>) -> Response {
    let (id, session) = state.comms.open_session(&state.channel_id).await;
    info!(channel_id = %state.channel_id, session_id = %id, "http session created");
    let s = session.lock().await;
    (StatusCode::CREATED, Json(session_view(id, &s))).into_response()
}

/// GET /api/sessions/{id}
pub(super) async fn session_detail(State(state): State<AxumState>, Path(id): Path<Uuid>) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let s = session.lock().await;
    Json(session_view(id, &s)).into_response()
}

/// DELETE /api/sessions/{id}
pub(super) async fn delete_session(State(state): State<AxumState>, Path(id): Path<Uuid>) -> Response {
    if state.comms.close_session(&state.channel_id, &id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, json_error("not_found", format!("no session {id}"))).into_response()
    }
}

/// POST /api/sessions/{id}/messages
///
/// Replies with the messages the turn appended. On collaborator failure the
/// status is 502 and the body still carries those messages. A turn that
/// outlives `TURN_TIMEOUT` is abandoned with an `Error:` message and 504.
pub(super) async fn message(
    State(state): State<AxumState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let mut s = session.lock().await;
    let before = s.transcript().len();

    let result = tokio::time::timeout(TURN_TIMEOUT, state.comms.assistant().submit(&mut s, &req.message)).await;

    match result {
        Ok(Ok(outcome)) => Json(json!({
            "outcome": outcome,
            "stage": s.stage(),
            "messages": s.transcript().since(before),
        }))
        .into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, session_id = %id, error = %e, "turn failed");
            let (status, code) = error_status(&e);
            turn_error(status, code, e, &s, before)
        }
        Err(_) => {
            warn!(channel_id = %state.channel_id, session_id = %id, timeout_secs = TURN_TIMEOUT.as_secs(), "turn timed out");
            let msg = format!("assistant turn timed out after {}s", TURN_TIMEOUT.as_secs());
            s.push(Message::assistant(format!("Error: {msg}")));
            turn_error(StatusCode::GATEWAY_TIMEOUT, "timeout", msg, &s, before)
        }
    }
}

/// Error body for a turn that did not complete, carrying the messages it
/// appended.
fn turn_error(status: StatusCode, code: &str, msg: impl std::fmt::Display, s: &SessionState, before: usize) -> Response {
    let body = json!({
        "error": code,
        "message": msg.to_string(),
        "stage": s.stage(),
        "messages": s.transcript().since(before),
    });
    (status, Json(body)).into_response()
}

/// DELETE /api/sessions/{id}/transcript
pub(super) async fn clear_transcript(State(state): State<AxumState>, Path(id): Path<Uuid>) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let mut s = session.lock().await;
    s.clear_transcript();
    Json(session_view(id, &s)).into_response()
}

/// POST /api/sessions/{id}/menu
pub(super) async fn return_to_menu(State(state): State<AxumState>, Path(id): Path<Uuid>) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let mut s = session.lock().await;
    let before = s.transcript().len();
    s.return_to_menu();
    Json(json!({
        "stage": s.stage(),
        "messages": s.transcript().since(before),
    }))
    .into_response()
}

/// PUT /api/sessions/{id}/slots/{name}
pub(super) async fn set_slot(
    State(state): State<AxumState>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(value): Json<Value>,
) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let previous = session.lock().await.set_slot(name.clone(), value);
    Json(json!({ "name": name, "previous": previous })).into_response()
}

/// POST /api/sessions/{id}/flashcards/search
pub(super) async fn search_flashcards(
    State(state): State<AxumState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlashcardSearchRequest>,
) -> Response {
    let session = match lookup(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let assistant = state.comms.assistant();
    let k = req.k.unwrap_or(assistant.settings().top_k);
    if k == 0 {
        return (StatusCode::BAD_REQUEST, json_error("bad_request", "k must be at least 1")).into_response();
    }

    let s = session.lock().await;
    match assistant.search_flashcards(&s, &req.query, k).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, session_id = %id, error = %e, "flashcard search failed");
            let (status, code) = error_status(&e);
            (status, json_error(code, e)).into_response()
        }
    }
}
