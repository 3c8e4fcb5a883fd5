use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::db::models::{TransactionInsert, TransactionStatus, TransactionView};
use crate::error::AppError;
use crate::handlers::notify::DEFAULT_CURRENCY;
use crate::handlers::{parse_json_body, value_as_f64, value_as_i64};
use crate::payments::amount_in_cny;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

pub fn build_insert(
    request: CreateTransactionRequest,
    cny_to_rub_rate: f64,
) -> Result<TransactionInsert, AppError> {
    let amount = value_as_f64(request.amount.as_ref(), "amount")?;
    if amount <= 0.0 {
        return Err(AppError::Validation("amount must be positive".to_string()));
    }
    let currency = request
        .currency
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    Ok(TransactionInsert {
        amount,
        amount_cny: amount_in_cny(amount, &currency, cny_to_rub_rate),
        currency,
    })
}

pub async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TransactionView>>, AppError> {
    Ok(Json(state.db.list_transactions().await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TransactionView>), AppError> {
    let request: CreateTransactionRequest = parse_json_body(&body)?;
    let insert = build_insert(request, state.config.cny_to_rub_rate)?;
    let created = state.db.create_transaction(insert).await?;
    info!(
        transaction_id = created.id,
        amount = created.amount,
        currency = %created.currency,
        "Top-up transaction created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TransactionView>, AppError> {
    let request: UpdateTransactionRequest = parse_json_body(&body)?;
    let transaction_id = value_as_i64(request.id.as_ref(), "id")?;
    let status = request
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<TransactionStatus>()
        .map_err(AppError::Validation)?;

    let updated = state
        .db
        .set_transaction_status(transaction_id, status)
        .await?
        .ok_or(AppError::NotFound("Transaction not found"))?;
    info!(transaction_id, %status, "Transaction status set manually");
    Ok(Json(updated))
}
