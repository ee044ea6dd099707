//! HTTP surface for the chat relay.
//!
//! Routes:
//! - `GET /` - service health and endpoint map
//! - `POST /api/chat/ai` - send one message and receive a reply
//! - `GET /api/chat/sessions/{id}` - stored history for a session
//! - `GET /api/chat/test` - whether an external credential is configured

use crate::app::StorageKind;
use crate::chat::{
    domain::Session,
    ports::ChatPort,
    services::{ChatRequest, ChatResponse},
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Chat service the handlers delegate to.
    pub chat: Arc<dyn ChatPort>,
    /// Storage backend reported by the health endpoint.
    pub storage: StorageKind,
}

impl ApiState {
    /// Creates handler state.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatPort>, storage: StorageKind) -> Self {
        Self { chat, storage }
    }
}

/// Builds the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/chat/ai", post(chat_reply))
        .route("/api/chat/sessions/{id}", get(session_history))
        .route("/api/chat/test", get(chat_status))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Endpoints {
    chat: &'static str,
    sessions: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
    storage: &'static str,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    success: bool,
    message: &'static str,
    api_key: &'static str,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    success: bool,
    session: Session,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

/// Failures surfaced by handlers other than the chat endpoint.
#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = Json(ErrorResponse {
            success: false,
            message,
        });
        (status, body).into_response()
    }
}

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Parley chat relay",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage.as_str(),
        endpoints: Endpoints {
            chat: "/api/chat/ai",
            sessions: "/api/chat/sessions/{id}",
            status: "/api/chat/test",
        },
    })
}

/// An unreadable body is handled like a body without a message.
async fn chat_reply(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>) {
    let request = payload.map_or_else(
        |rejection| {
            debug!(error = %rejection, "unreadable chat request body");
            ChatRequest::default()
        },
        |Json(request)| request,
    );

    let response = state.chat.reply(request).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response))
}

async fn session_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state
        .chat
        .history(&id)
        .await
        .map_err(|err| {
            error!(session_id = %id, error = %err, "failed to load chat history");
            ApiError::Internal("Failed to load session".to_owned())
        })?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_owned()))?;

    Ok(Json(HistoryResponse {
        success: true,
        session,
    }))
}

async fn chat_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        message: "Chat API is working",
        api_key: if state.chat.is_configured() {
            "Configured"
        } else {
            "Not configured"
        },
    })
}
