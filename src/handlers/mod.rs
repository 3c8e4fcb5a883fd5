pub mod notify;
pub mod payment_details;
pub mod transactions;
pub mod webhook;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub const CORS_ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const CORS_ALLOWED_HEADERS: &str = "Content-Type, X-Admin-Key, X-Request-Id";
pub const CORS_MAX_AGE_SECS: u64 = 86400;

/// Parses a JSON body; an empty body reads as `{}`.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|err| AppError::Validation(format!("Invalid JSON body: {err}")))
}

/// Renders a JSON scalar as text: strings verbatim, numbers in their JSON form.
pub fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn value_as_i64(value: Option<&Value>, field: &str) -> Result<i64, AppError> {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::Validation(format!("{field} must be an integer")))
}

pub fn value_as_f64(value: Option<&Value>, field: &str) -> Result<f64, AppError> {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| AppError::Validation(format!("{field} must be a number")))
}

pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                CORS_ALLOWED_METHODS.to_string(),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                CORS_ALLOWED_HEADERS.to_string(),
            ),
            (header::ACCESS_CONTROL_MAX_AGE, CORS_MAX_AGE_SECS.to_string()),
        ],
    )
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.db.health_check().await?;
    Ok(Json(json!({ "ok": true })))
}
