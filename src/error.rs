use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::Envelope;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing action parameter")]
    MissingAction,

    #[error("invalid action parameter")]
    InvalidAction,

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("request body cannot be empty")]
    EmptyBody,

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("SILICONFLOW_KEY is not configured")]
    MissingCredential,

    #[error("error calling SiliconFlow API: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Failures are reported in the envelope; only storage faults change the status.
        let (status, message) = match self {
            AppError::Database(_) => {
                tracing::error!("Database error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Upstream(_) | AppError::Http(_) => {
                tracing::warn!("Stream proxy failed: {}", self);
                (StatusCode::OK, self.to_string())
            }
            _ => (StatusCode::OK, self.to_string()),
        };

        (status, Envelope::error(message)).into_response()
    }
}
