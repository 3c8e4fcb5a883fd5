use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("Unknown transaction status: {other}")),
        }
    }
}

/// Outcome of writing a status onto a stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    AlreadyDecided(TransactionStatus),
    NotFound,
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    pub amount_cny: f64,
    pub status: TransactionStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub recipient_name: Option<String>,
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientSummary {
    pub recipient_name: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    pub amount_cny: f64,
    pub status: TransactionStatus,
    pub date: Option<DateTime<Utc>>,
    pub payment_details: Option<RecipientSummary>,
}

impl From<TransactionRow> for TransactionView {
    fn from(row: TransactionRow) -> Self {
        let payment_details = row.recipient_name.map(|recipient_name| RecipientSummary {
            recipient_name,
            account_number: row.account_number.unwrap_or_default(),
        });
        TransactionView {
            id: row.id,
            amount: row.amount,
            currency: row.currency,
            amount_cny: row.amount_cny,
            status: row.status,
            date: row.created_at,
            payment_details,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionInsert {
    pub amount: f64,
    pub currency: String,
    pub amount_cny: f64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentDetail {
    pub id: i64,
    pub recipient_name: String,
    pub account_number: String,
    pub currency: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PaymentDetailInsert {
    pub recipient_name: String,
    pub account_number: String,
    pub currency: String,
    pub is_active: bool,
}
