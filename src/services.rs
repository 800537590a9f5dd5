use crate::audit::{AuditEventType, AuditLog};
use crate::errors::{GatewayError, Result};
use crate::metrics;
use crate::models::{
    LoginRequest, LoginResponse, PaymentRequest, PaymentResponse, RegisterRequest,
    RegisterResponse, Transaction,
};
use crate::password;
use crate::storage::{NewTransaction, Storage};
use crate::throttle::LoginThrottle;
use crate::tokens::TokenIssuer;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Total attempts for a storage operation. Only `StorageUnavailable` is
/// retried; every other outcome returns on the first attempt.
const STORAGE_ATTEMPTS: u32 = 3;
const STORAGE_RETRY_DELAY_MS: u64 = 100;

/// Orchestrates registration, login, and payment recording over the
/// injected store, throttle, and token issuer. Current time is passed in
/// by callers so the throttle window and token expiry can be driven by a
/// simulated clock.
pub struct GatewayService {
    store: Arc<dyn Storage>,
    throttle: Arc<LoginThrottle>,
    tokens: Arc<TokenIssuer>,
    audit: Option<Arc<AuditLog>>,
}

impl GatewayService {
    pub fn new(
        store: Arc<dyn Storage>,
        throttle: Arc<LoginThrottle>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        GatewayService {
            store,
            throttle,
            tokens,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Register a new account. The store's uniqueness constraint is the
    /// authoritative duplicate guard; the lookup before the insert only
    /// saves an expensive hash-and-insert round trip for the common case.
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse> {
        validator::Validate::validate(&request)
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        if self
            .with_retry(|| self.store.find_account_by_email(&request.email))
            .await?
            .is_some()
        {
            warn!("Registration rejected, email already registered: {}", request.email);
            metrics::REGISTRATIONS_TOTAL
                .with_label_values(&["duplicate_email"])
                .inc();
            self.audit(
                AuditEventType::RegistrationRejected,
                &request.email,
                Some("duplicate email".to_string()),
            )
            .await;
            return Err(GatewayError::DuplicateEmail);
        }

        let password_hash = Self::hash_password(request.password).await?;

        let account = self
            .with_retry(|| self.store.create_account(&request.email, &password_hash))
            .await?;

        info!("Registered account {} for {}", account.id, account.email);
        metrics::REGISTRATIONS_TOTAL
            .with_label_values(&["success"])
            .inc();
        self.audit(AuditEventType::AccountRegistered, &account.email, None)
            .await;

        Ok(RegisterResponse {
            message: "User registered successfully".to_string(),
            account_id: account.id,
        })
    }

    /// Authenticate and issue a bearer token.
    ///
    /// The throttle gate runs before any credential lookup, so a throttled
    /// caller learns nothing about whether the account exists. Unknown
    /// email and wrong password fail identically.
    pub async fn login(&self, request: LoginRequest, now: DateTime<Utc>) -> Result<LoginResponse> {
        validator::Validate::validate(&request)
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        if self.throttle.is_locked(&request.email, now).await {
            warn!("Login throttled for {}", request.email);
            metrics::LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["throttled"])
                .inc();
            self.audit(AuditEventType::LoginThrottled, &request.email, None)
                .await;
            return Err(GatewayError::TooManyAttempts);
        }

        let account = self
            .with_retry(|| self.store.find_account_by_email(&request.email))
            .await?;

        let matched = match account {
            Some(account) => {
                if Self::verify_password(request.password, account.password_hash.clone()).await? {
                    Some(account)
                } else {
                    None
                }
            }
            None => None,
        };

        let Some(account) = matched else {
            self.throttle.record_failure(&request.email, now).await;
            warn!("Failed login attempt for {}", request.email);
            metrics::LOGIN_ATTEMPTS_TOTAL
                .with_label_values(&["invalid_credentials"])
                .inc();
            self.audit(AuditEventType::LoginFailed, &request.email, None)
                .await;
            return Err(GatewayError::InvalidCredentials);
        };

        self.throttle.reset(&request.email).await;
        let token = self.tokens.issue(account.id, now)?;

        info!("Login succeeded for account {}", account.id);
        metrics::LOGIN_ATTEMPTS_TOTAL
            .with_label_values(&["success"])
            .inc();
        self.audit(AuditEventType::LoginSucceeded, &request.email, None)
            .await;

        Ok(LoginResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        })
    }

    /// Resolve a bearer token to an account id.
    pub fn authorize(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid> {
        match self.tokens.verify(token, now) {
            Ok(account_id) => {
                metrics::TOKEN_VERIFICATIONS_TOTAL
                    .with_label_values(&["success"])
                    .inc();
                Ok(account_id)
            }
            Err(e) => {
                metrics::TOKEN_VERIFICATIONS_TOTAL
                    .with_label_values(&["rejected"])
                    .inc();
                Err(e)
            }
        }
    }

    /// Record a payment at most once per idempotency key.
    ///
    /// The existence lookup is a fast path; under concurrent submissions of
    /// the same key the store's uniqueness constraint decides which request
    /// wins, and the loser surfaces `DuplicateTransaction`.
    pub async fn record_payment(
        &self,
        account_id: Uuid,
        request: PaymentRequest,
    ) -> Result<PaymentResponse> {
        validator::Validate::validate(&request)
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        if request.amount <= Decimal::ZERO {
            warn!(
                "Invalid payment amount {} from account {}",
                request.amount, account_id
            );
            metrics::PAYMENTS_TOTAL
                .with_label_values(&["invalid_amount"])
                .inc();
            self.audit(
                AuditEventType::PaymentRejected,
                &account_id.to_string(),
                Some("invalid amount".to_string()),
            )
            .await;
            return Err(GatewayError::InvalidAmount);
        }

        if self
            .with_retry(|| {
                self.store
                    .find_transaction_by_idempotency_key(&request.idempotency_key)
            })
            .await?
            .is_some()
        {
            return self.reject_duplicate(account_id, &request.idempotency_key).await;
        }

        let new = NewTransaction {
            account_id,
            amount: request.amount,
            currency: request.currency,
            merchant_id: request.merchant_id,
            idempotency_key: request.idempotency_key,
        };

        let transaction = match self.with_retry(|| self.store.insert_transaction(&new)).await {
            Ok(transaction) => transaction,
            Err(GatewayError::DuplicateTransaction) => {
                // Lost the race to a concurrent request with the same key
                return self.reject_duplicate(account_id, &new.idempotency_key).await;
            }
            Err(e) => return Err(e),
        };

        info!(
            "Recorded transaction {} for account {} ({} {})",
            transaction.id, account_id, transaction.amount, transaction.currency
        );
        metrics::PAYMENTS_TOTAL
            .with_label_values(&["recorded"])
            .inc();
        self.audit(
            AuditEventType::PaymentRecorded,
            &account_id.to_string(),
            Some(transaction.idempotency_key.clone()),
        )
        .await;

        Ok(PaymentResponse {
            message: "Payment processed".to_string(),
            transaction_id: transaction.id,
        })
    }

    pub async fn list_transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        self.with_retry(|| self.store.list_transactions_by_account(account_id))
            .await
    }

    async fn reject_duplicate(
        &self,
        account_id: Uuid,
        idempotency_key: &str,
    ) -> Result<PaymentResponse> {
        warn!(
            "Duplicate payment attempt by account {}: {}",
            account_id, idempotency_key
        );
        metrics::PAYMENTS_TOTAL
            .with_label_values(&["duplicate"])
            .inc();
        self.audit(
            AuditEventType::PaymentRejected,
            &account_id.to_string(),
            Some(format!("duplicate idempotency key: {}", idempotency_key)),
        )
        .await;
        Err(GatewayError::DuplicateTransaction)
    }

    /// Hashing is deliberately expensive; run it on the blocking pool so
    /// worker threads keep serving requests.
    async fn hash_password(plaintext: String) -> Result<String> {
        tokio::task::spawn_blocking(move || password::hash(&plaintext))
            .await
            .map_err(|e| {
                error!("Password hashing task failed: {}", e);
                GatewayError::Internal("password hashing task failed".to_string())
            })?
    }

    async fn verify_password(plaintext: String, stored: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || password::verify(&plaintext, &stored))
            .await
            .map_err(|e| {
                error!("Password verification task failed: {}", e);
                GatewayError::Internal("password verification task failed".to_string())
            })
    }

    /// Bounded retry for storage operations. `StorageUnavailable` is the
    /// only retryable class; duplicates and every user-facing rejection
    /// return immediately.
    async fn with_retry<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(GatewayError::StorageUnavailable) if attempt < STORAGE_ATTEMPTS => {
                    warn!(
                        "Storage unavailable, retrying ({}/{})",
                        attempt,
                        STORAGE_ATTEMPTS - 1
                    );
                    metrics::STORAGE_RETRIES_TOTAL.inc();
                    tokio::time::sleep(Duration::from_millis(
                        STORAGE_RETRY_DELAY_MS * attempt as u64,
                    ))
                    .await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn audit(&self, event_type: AuditEventType, subject: &str, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(event_type, subject, detail).await {
                error!("Failed to write audit event: {}", e);
            }
        }
    }
}
