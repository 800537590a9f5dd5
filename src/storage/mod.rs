pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{Account, Transaction};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction fields as submitted by the ledger, before the store assigns
/// an id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub merchant_id: String,
    pub idempotency_key: String,
}

/// Durable store behind the gateway.
///
/// Duplicate detection is part of the contract, not an application-level
/// courtesy: `create_account` must reject a conflicting email with
/// `DuplicateEmail` and `insert_transaction` must reject a conflicting
/// idempotency key with `DuplicateTransaction`, atomically against
/// concurrent inserts carrying the same key. Any other storage failure
/// surfaces as `StorageUnavailable`.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction>;

    async fn find_transaction_by_idempotency_key(&self, key: &str)
        -> Result<Option<Transaction>>;

    /// All transactions for an account, in insertion order.
    async fn list_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>>;
}
