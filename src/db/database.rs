use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::{
    PaymentDetail, PaymentDetailInsert, StatusUpdate, TransactionInsert, TransactionRow,
    TransactionStatus, TransactionView,
};
use crate::db::store::TransactionStore;

const TRANSACTION_SELECT: &str = "SELECT t.id, t.amount, t.currency, t.amount_cny, t.status, \
     t.created_at, pd.recipient_name, pd.account_number \
     FROM transactions t LEFT JOIN payment_details pd ON t.payment_detail_id = pd.id";

const PAYMENT_DETAIL_SELECT: &str =
    "SELECT id, recipient_name, account_number, currency, is_active, created_at FROM payment_details";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every in-memory connection is a separate database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS payment_details (\
                id INTEGER PRIMARY KEY AUTOINCREMENT,\
                recipient_name TEXT NOT NULL,\
                account_number TEXT NOT NULL,\
                currency TEXT NOT NULL DEFAULT 'CNY',\
                is_active INTEGER NOT NULL DEFAULT 1,\
                created_at TEXT NOT NULL,\
                updated_at TEXT\
            );",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (\
                id INTEGER PRIMARY KEY AUTOINCREMENT,\
                amount REAL NOT NULL,\
                currency TEXT NOT NULL,\
                amount_cny REAL NOT NULL,\
                status TEXT NOT NULL DEFAULT 'pending' \
                    CHECK (status IN ('pending', 'completed', 'failed')),\
                payment_detail_id INTEGER,\
                created_at TEXT NOT NULL,\
                updated_at TEXT,\
                FOREIGN KEY(payment_detail_id) REFERENCES payment_details(id) ON DELETE SET NULL\
            );",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at);",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_payment_details_active_currency \
             ON payment_details(is_active, currency);",
        )
        .execute(&pool)
        .await?;

        info!("Database tables created successfully");

        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list_transactions(&self) -> Result<Vec<TransactionView>> {
        let query = format!("{TRANSACTION_SELECT} ORDER BY t.created_at DESC, t.id DESC");
        let rows = sqlx::query_as::<_, TransactionRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TransactionView::from).collect())
    }

    pub async fn get_transaction(&self, transaction_id: i64) -> Result<Option<TransactionView>> {
        let query = format!("{TRANSACTION_SELECT} WHERE t.id = ?");
        let row = sqlx::query_as::<_, TransactionRow>(&query)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TransactionView::from))
    }

    /// Picks the recipient for a new transaction: same currency first, then any active one.
    async fn select_recipient(&self, currency: &str) -> Result<Option<i64>> {
        let same_currency = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM payment_details WHERE is_active = 1 AND currency = ? \
             ORDER BY id LIMIT 1",
        )
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;
        if same_currency.is_some() {
            return Ok(same_currency);
        }

        let any_active = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM payment_details WHERE is_active = 1 ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(any_active)
    }

    pub async fn create_transaction(&self, insert: TransactionInsert) -> Result<TransactionView> {
        let payment_detail_id = self.select_recipient(&insert.currency).await?;

        let result = sqlx::query(
            "INSERT INTO transactions (amount, currency, amount_cny, status, payment_detail_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(insert.amount)
        .bind(&insert.currency)
        .bind(insert.amount_cny)
        .bind(TransactionStatus::Pending)
        .bind(payment_detail_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let transaction_id = result.last_insert_rowid();
        debug!(transaction_id, ?payment_detail_id, "Transaction created");
        self.get_transaction(transaction_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Transaction {transaction_id} vanished after insert"))
    }

    pub async fn set_transaction_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<Option<TransactionView>> {
        let result = sqlx::query("UPDATE transactions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(transaction_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_transaction(transaction_id).await
    }

    async fn current_status(&self, transaction_id: i64) -> Result<Option<TransactionStatus>> {
        let status = sqlx::query_scalar::<_, TransactionStatus>(
            "SELECT status FROM transactions WHERE id = ?",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    pub async fn list_payment_details(&self) -> Result<Vec<PaymentDetail>> {
        let query = format!("{PAYMENT_DETAIL_SELECT} ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, PaymentDetail>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_payment_detail(&self, detail_id: i64) -> Result<Option<PaymentDetail>> {
        let query = format!("{PAYMENT_DETAIL_SELECT} WHERE id = ?");
        let row = sqlx::query_as::<_, PaymentDetail>(&query)
            .bind(detail_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create_payment_detail(&self, insert: PaymentDetailInsert) -> Result<PaymentDetail> {
        let result = sqlx::query(
            "INSERT INTO payment_details (recipient_name, account_number, currency, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&insert.recipient_name)
        .bind(&insert.account_number)
        .bind(&insert.currency)
        .bind(insert.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let detail_id = result.last_insert_rowid();
        self.get_payment_detail(detail_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Payment detail {detail_id} vanished after insert"))
    }

    pub async fn update_payment_detail(
        &self,
        detail_id: i64,
        update: PaymentDetailInsert,
    ) -> Result<Option<PaymentDetail>> {
        let result = sqlx::query(
            "UPDATE payment_details SET recipient_name = ?, account_number = ?, currency = ?, \
             is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&update.recipient_name)
        .bind(&update.account_number)
        .bind(&update.currency)
        .bind(update.is_active)
        .bind(Utc::now())
        .bind(detail_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_payment_detail(detail_id).await
    }

    pub async fn delete_payment_detail(&self, detail_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payment_details WHERE id = ?")
            .bind(detail_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TransactionStore for Database {
    async fn update_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate> {
        let updated = self.set_transaction_status(transaction_id, status).await?;
        Ok(match updated {
            Some(_) => StatusUpdate::Applied,
            None => StatusUpdate::NotFound,
        })
    }

    async fn resolve_pending(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(transaction_id)
        .bind(TransactionStatus::Pending)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(StatusUpdate::Applied);
        }

        Ok(match self.current_status(transaction_id).await? {
            Some(current) => StatusUpdate::AlreadyDecided(current),
            None => StatusUpdate::NotFound,
        })
    }
}
