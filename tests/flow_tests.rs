// Flow tests for registration, login throttling, and idempotent payment
// recording, driven against the in-memory store with simulated clocks.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use payment_gateway::errors::GatewayError;
    use payment_gateway::models::{LoginRequest, PaymentRequest, RegisterRequest};
    use payment_gateway::services::GatewayService;
    use payment_gateway::storage::memory::MemoryStorage;
    use payment_gateway::storage::Storage;
    use payment_gateway::throttle::LoginThrottle;
    use payment_gateway::tokens::TokenIssuer;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const EMAIL: &str = "alice@example.com";
    const PASSWORD: &str = "correct-horse-battery";

    fn build_service(store: Arc<MemoryStorage>) -> GatewayService {
        let throttle = Arc::new(LoginThrottle::new(5, Duration::seconds(300)));
        let tokens = Arc::new(TokenIssuer::new(SECRET, Duration::minutes(10)));
        GatewayService::new(store, throttle, tokens)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn payment_request(amount: Decimal, key: &str) -> PaymentRequest {
        PaymentRequest {
            amount,
            currency: "USD".to_string(),
            merchant_id: "merchant-1".to_string(),
            idempotency_key: key.to_string(),
        }
    }

    async fn register_and_login(
        service: &GatewayService,
        now: DateTime<Utc>,
    ) -> (Uuid, String) {
        let registered = service.register(register_request(EMAIL)).await.unwrap();
        let login = service
            .login(login_request(EMAIL, PASSWORD), now)
            .await
            .unwrap();
        (registered.account_id, login.access_token)
    }

    #[tokio::test]
    async fn test_register_login_authorize_roundtrip() {
        let service = build_service(Arc::new(MemoryStorage::new()));
        let now = Utc::now();

        let (account_id, token) = register_and_login(&service, now).await;
        let login = service.login(login_request(EMAIL, PASSWORD), now).await.unwrap();
        assert_eq!(login.token_type, "bearer");

        assert_eq!(service.authorize(&token, now).unwrap(), account_id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_leaves_original_account_intact() {
        let store = Arc::new(MemoryStorage::new());
        let service = build_service(store.clone());

        service.register(register_request(EMAIL)).await.unwrap();
        let original_hash = store
            .find_account_by_email(EMAIL)
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let second = service
            .register(RegisterRequest {
                email: EMAIL.to_string(),
                password: "a different password".to_string(),
            })
            .await;
        assert!(matches!(second, Err(GatewayError::DuplicateEmail)));

        let stored_hash = store
            .find_account_by_email(EMAIL)
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert_eq!(stored_hash, original_hash);
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures_and_recovery() {
        let service = build_service(Arc::new(MemoryStorage::new()));
        let start = Utc::now();

        service.register(register_request(EMAIL)).await.unwrap();

        for _ in 0..5 {
            let result = service
                .login(login_request(EMAIL, "wrong password"), start)
                .await;
            assert!(matches!(result, Err(GatewayError::InvalidCredentials)));
        }

        // Locked out now, even with the correct password
        let locked = service.login(login_request(EMAIL, PASSWORD), start).await;
        assert!(matches!(locked, Err(GatewayError::TooManyAttempts)));

        // Once the earliest failure ages out of the window, the correct
        // password goes through again
        let recovered = service
            .login(login_request(EMAIL, PASSWORD), start + Duration::seconds(301))
            .await;
        assert!(recovered.is_ok());
    }

    #[tokio::test]
    async fn test_throttle_gate_runs_before_credential_lookup() {
        let service = build_service(Arc::new(MemoryStorage::new()));
        let now = Utc::now();

        // No such account: failures are recorded all the same, and once
        // throttled the rejection changes from InvalidCredentials to
        // TooManyAttempts, exactly as for a real account.
        for _ in 0..5 {
            let result = service
                .login(login_request("ghost@example.com", "whatever"), now)
                .await;
            assert!(matches!(result, Err(GatewayError::InvalidCredentials)));
        }

        let throttled = service
            .login(login_request("ghost@example.com", "whatever"), now)
            .await;
        assert!(matches!(throttled, Err(GatewayError::TooManyAttempts)));
    }

    #[tokio::test]
    async fn test_successful_login_resets_throttle() {
        let service = build_service(Arc::new(MemoryStorage::new()));
        let now = Utc::now();

        service.register(register_request(EMAIL)).await.unwrap();

        for _ in 0..4 {
            let _ = service.login(login_request(EMAIL, "wrong password"), now).await;
        }
        service.login(login_request(EMAIL, PASSWORD), now).await.unwrap();

        // The slate is clean: four more failures do not lock the account
        for _ in 0..4 {
            let _ = service.login(login_request(EMAIL, "wrong password"), now).await;
        }
        let result = service.login(login_request(EMAIL, PASSWORD), now).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_nonpositive_amounts_rejected_and_not_stored() {
        let store = Arc::new(MemoryStorage::new());
        let service = build_service(store.clone());
        let now = Utc::now();

        let (account_id, _) = register_and_login(&service, now).await;

        for amount in [dec!(0), dec!(-5)] {
            let result = service
                .record_payment(account_id, payment_request(amount, "key-1"))
                .await;
            assert!(matches!(result, Err(GatewayError::InvalidAmount)));
        }

        let stored = store.list_transactions_by_account(account_id).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_idempotency_key_reuse_rejected() {
        let store = Arc::new(MemoryStorage::new());
        let service = build_service(store.clone());
        let now = Utc::now();

        let (account_id, _) = register_and_login(&service, now).await;

        service
            .record_payment(account_id, payment_request(dec!(10.00), "key-1"))
            .await
            .unwrap();

        // Retried with a different amount: rejected, not deduplicated
        let retry = service
            .record_payment(account_id, payment_request(dec!(99.00), "key-1"))
            .await;
        assert!(matches!(retry, Err(GatewayError::DuplicateTransaction)));

        let stored = store.list_transactions_by_account(account_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, dec!(10.00));
    }

    #[tokio::test]
    async fn test_concurrent_same_key_stores_exactly_one_transaction() {
        let store = Arc::new(MemoryStorage::new());
        let service = build_service(store.clone());
        let now = Utc::now();

        let (account_id, _) = register_and_login(&service, now).await;

        let (first, second) = tokio::join!(
            service.record_payment(account_id, payment_request(dec!(10.00), "key-1")),
            service.record_payment(account_id, payment_request(dec!(20.00), "key-1")),
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        let duplicates = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(GatewayError::DuplicateTransaction)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 1);

        let stored = store.list_transactions_by_account(account_id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_token_expiry_boundary_through_authorize() {
        let service = build_service(Arc::new(MemoryStorage::new()));
        let issued_at = Utc::now();

        let (account_id, token) = register_and_login(&service, issued_at).await;

        let still_valid = service.authorize(&token, issued_at + Duration::seconds(599));
        assert_eq!(still_valid.unwrap(), account_id);

        let expired = service.authorize(&token, issued_at + Duration::seconds(601));
        assert!(matches!(expired, Err(GatewayError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_listing_never_crosses_accounts() {
        let service = build_service(Arc::new(MemoryStorage::new()));

        let alice = service.register(register_request(EMAIL)).await.unwrap();
        let bob = service
            .register(register_request("bob@example.com"))
            .await
            .unwrap();

        service
            .record_payment(alice.account_id, payment_request(dec!(10.00), "key-a"))
            .await
            .unwrap();
        service
            .record_payment(bob.account_id, payment_request(dec!(20.00), "key-b"))
            .await
            .unwrap();

        let listed = service.list_transactions(alice.account_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].idempotency_key, "key-a");
        assert!(listed.iter().all(|t| t.account_id == alice.account_id));
    }

    #[tokio::test]
    async fn test_malformed_requests_rejected_before_any_effect() {
        let store = Arc::new(MemoryStorage::new());
        let service = build_service(store.clone());

        let result = service
            .register(RegisterRequest {
                email: "not-an-email".to_string(),
                password: PASSWORD.to_string(),
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        let result = service
            .register(RegisterRequest {
                email: EMAIL.to_string(),
                password: "short".to_string(),
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));

        assert!(store.find_account_by_email(EMAIL).await.unwrap().is_none());
    }
}
