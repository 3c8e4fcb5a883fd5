use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{StatusUpdate, TransactionStatus};

/// Persistence seam used by the approval workflow.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Overwrites the status regardless of its current value.
    async fn update_status(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate>;

    /// Moves a transaction out of `pending`; decided transactions are left untouched.
    async fn resolve_pending(
        &self,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<StatusUpdate>;
}
