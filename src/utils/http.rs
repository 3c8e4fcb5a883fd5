use std::time::Duration;

use axum::http::HeaderMap;
use reqwest::Client;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared client for Bot API calls; every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}

/// Uses the caller's `x-request-id` when present, otherwise mints one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
