use super::{NewTransaction, Storage};
use crate::errors::{GatewayError, Result};
use crate::models::{Account, Transaction};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store with the same check-and-insert atomicity the Postgres
/// constraints provide: each insert holds the write lock across the
/// duplicate check and the append, so two concurrent inserts carrying the
/// same key resolve to exactly one row and one conflict. Backs flow tests
/// and local runs without a database.
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account> {
        let mut inner = self.inner.write().await;

        if inner.accounts.iter().any(|a| a.email == email) {
            return Err(GatewayError::DuplicateEmail);
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.accounts.push(account.clone());

        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let mut inner = self.inner.write().await;

        if inner
            .transactions
            .iter()
            .any(|t| t.idempotency_key == new.idempotency_key)
        {
            return Err(GatewayError::DuplicateTransaction);
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            account_id: new.account_id,
            amount: new.amount,
            currency: new.currency.clone(),
            merchant_id: new.merchant_id.clone(),
            idempotency_key: new.idempotency_key.clone(),
            created_at: Utc::now(),
        };
        inner.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn find_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .iter()
            .find(|t| t.idempotency_key == key)
            .cloned())
    }

    async fn list_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }
}
