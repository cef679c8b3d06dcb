//! HTTP surface: `/chat`, `/greeting`, `/admin/translate_guide/{id}`, `/health`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::any::Any as PanicPayload;
use std::sync::Arc;
use terrabot_core::chat::{ChatPipeline, EMPTY_MESSAGE};
use terrabot_core::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

pub const INTERNAL_ERROR: &str = "An unexpected error occurred.";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
}

impl AppState {
    pub fn new(pipeline: ChatPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(m) => ApiError::BadRequest(m),
            Error::NotFound(m) => ApiError::NotFound(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, text) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, format!("Not found: {m}")),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };
        (status, Json(TextBody { text })).into_response()
    }
}

/// Raw bytes so a malformed body is a 400 with the usual `{"text": ..}` shape.
async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<TextBody>, ApiError> {
    let req: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "unreadable chat body");
        ApiError::BadRequest(EMPTY_MESSAGE.to_string())
    })?;
    let reply = state.pipeline.respond(&req.message).await?;
    tracing::info!(kind = ?reply.kind, "chat reply");
    if reply.is_rejected() {
        return Err(ApiError::Forbidden(reply.text));
    }
    Ok(Json(TextBody { text: reply.text }))
}

async fn greeting(State(state): State<AppState>) -> Json<TextBody> {
    Json(TextBody {
        text: state.pipeline.greeting(),
    })
}

async fn translate_guide(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusBody>, ApiError> {
    let outcome = state.pipeline.translate_guide(&id).await?;
    Ok(Json(StatusBody {
        status: outcome.as_str().to_string(),
    }))
}

async fn health() -> &'static str {
    "ok"
}

/// A panicking handler still answers with the generic 500 body.
fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(TextBody {
            text: INTERNAL_ERROR.to_string(),
        }),
    )
        .into_response()
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat))
        .route("/greeting", get(greeting))
        .route("/admin/translate_guide/:id", post(translate_guide))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, tiers = ?state.pipeline.tier_names(), "terrabot listening");
    }
    axum::serve(listener, app(state)).await
}
