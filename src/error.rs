use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A computation cycle did not produce every expected sector.
    /// Fatal for the cycle; nothing is persisted.
    #[error("Incomplete batch: missing sectors {missing:?}")]
    IncompleteBatch { missing: Vec<String> },

    /// Recompute rejected: hard cooldown has not elapsed.
    #[error("Cooldown active: retry after {retry_after_seconds}s")]
    CooldownActive { retry_after_seconds: i64 },

    /// Recompute rejected: a job is already in progress for this timeframe.
    #[error("Recompute already running since {started_at}")]
    AlreadyRunning { started_at: String },

    /// A running pipeline exceeded its time budget.
    #[error("Pipeline timed out after {0}s")]
    PipelineTimeout(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::IncompleteBatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::CooldownActive { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::AlreadyRunning { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::PipelineTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Upstream(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::SerdeJson(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Anyhow(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
