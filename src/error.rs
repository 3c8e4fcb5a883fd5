use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::payments::token::TokenError;
use crate::telegram::client::BotError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Failed to send to Telegram")]
    Delivery(#[source] BotError),
    #[error("Malformed callback data: {0}")]
    MalformedCallback(#[from] TokenError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedCallback(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Configuration(_)
            | AppError::Decode(_)
            | AppError::Delivery(_)
            | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, "Request failed: {}", self);
        } else {
            warn!(%status, "Request rejected: {}", self);
        }

        let body = match &self {
            AppError::Delivery(source) => json!({
                "error": self.to_string(),
                "details": source.details(),
            }),
            // Database internals stay in the logs.
            AppError::Store(_) => json!({ "error": "Internal server error" }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
