use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Remote store rejected the write: {0}")]
    RemoteRejected(String),

    /// The store reported success but the row never came back.
    #[error("Remote store silently ignored the write to {collection} {id}")]
    SilentRejection { collection: String, id: String },

    #[error("Compensating action failed: {0}")]
    CompensationFailed(String),

    #[error("Stored payload under '{key}' is corrupted: {details}")]
    CorruptPayload { key: String, details: String },

    #[error("Session changed while the operation was in flight")]
    SessionChanged,

    #[error("Internal server error")]
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, message),
            AppError::SessionChanged => (StatusCode::CONFLICT, message),
            AppError::RemoteRejected(_)
            | AppError::SilentRejection { .. }
            | AppError::Transport(_)
            | AppError::CompensationFailed(_) => (StatusCode::BAD_GATEWAY, message),
            AppError::CorruptPayload { .. } => {
                error!("{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Serialization(e) => {
                error!("serialization error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Serialization error occurred".to_string(),
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
