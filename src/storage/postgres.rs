use super::{NewTransaction, Storage};
use crate::errors::Result;
use crate::models::{Account, Transaction};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(PostgresStorage { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables if missing. The named UNIQUE constraints here are the
    /// authoritative guards against duplicate registration and idempotency
    /// key reuse; the error mapping keys off their names.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                CONSTRAINT accounts_email_key UNIQUE (email)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id UUID PRIMARY KEY,
                account_id UUID NOT NULL REFERENCES accounts (id),
                amount NUMERIC(20, 8) NOT NULL CHECK (amount > 0),
                currency TEXT NOT NULL,
                merchant_id TEXT NOT NULL,
                idempotency_key TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                CONSTRAINT transactions_idempotency_key_key UNIQUE (idempotency_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                id, account_id, amount, currency,
                merchant_id, idempotency_key, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.account_id)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(&new.merchant_id)
        .bind(&new.idempotency_key)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn find_transaction_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn list_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE account_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
