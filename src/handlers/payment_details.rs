use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::db::models::{PaymentDetail, PaymentDetailInsert};
use crate::error::AppError;
use crate::handlers::notify::DEFAULT_CURRENCY;
use crate::handlers::{parse_json_body, value_as_i64};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentDetailRequest {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn query_id(query: &DetailQuery) -> Result<Option<i64>, AppError> {
    match query.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::Validation("id must be an integer".to_string())),
        None => Ok(None),
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

pub fn build_detail(request: PaymentDetailRequest) -> Result<PaymentDetailInsert, AppError> {
    Ok(PaymentDetailInsert {
        recipient_name: required_text(request.recipient_name, "recipient_name")?,
        account_number: required_text(request.account_number, "account_number")?,
        currency: request
            .currency
            .map(|value| value.trim().to_uppercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        is_active: request.is_active.unwrap_or(true),
    })
}

pub async fn get_payment_details(
    State(state): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, AppError> {
    if let Some(detail_id) = query_id(&query)? {
        let detail = state
            .db
            .get_payment_detail(detail_id)
            .await?
            .ok_or(AppError::NotFound("Payment detail not found"))?;
        return Ok(Json(detail).into_response());
    }
    let details: Vec<PaymentDetail> = state.db.list_payment_details().await?;
    Ok(Json(details).into_response())
}

pub async fn create_payment_detail(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PaymentDetail>), AppError> {
    let request: PaymentDetailRequest = parse_json_body(&body)?;
    let insert = PaymentDetailInsert {
        is_active: true,
        ..build_detail(request)?
    };
    let created = state.db.create_payment_detail(insert).await?;
    info!(detail_id = created.id, currency = %created.currency, "Payment detail created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_payment_detail(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PaymentDetail>, AppError> {
    let request: PaymentDetailRequest = parse_json_body(&body)?;
    let detail_id = value_as_i64(request.id.as_ref(), "id")?;
    let update = build_detail(request)?;
    let updated = state
        .db
        .update_payment_detail(detail_id, update)
        .await?
        .ok_or(AppError::NotFound("Payment detail not found"))?;
    info!(detail_id, is_active = updated.is_active, "Payment detail updated");
    Ok(Json(updated))
}

pub async fn delete_payment_detail(
    State(state): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> Result<StatusCode, AppError> {
    let detail_id =
        query_id(&query)?.ok_or_else(|| AppError::Validation("id is required".to_string()))?;
    let removed = state.db.delete_payment_detail(detail_id).await?;
    debug!(detail_id, removed, "Payment detail delete processed");
    Ok(StatusCode::NO_CONTENT)
}
