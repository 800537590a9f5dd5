//! Stateless bearer tokens.
//!
//! Sessions are a pure function pair over a symmetric secret: `issue`
//! embeds the account id and expiry into a signed HS256 token, `verify`
//! checks the signature and expiry against a caller-supplied clock. No
//! server-side session records exist; rotating the secret invalidates
//! every outstanding token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, account_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Token signing failed: {}", e);
            GatewayError::Internal("token signing failed".to_string())
        })
    }

    /// All failure causes collapse to `InvalidToken`; the distinction only
    /// survives in diagnostics.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below, keeping
        // verification a pure function of (token, now).
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            warn!("Token rejected: {:?}", e.kind());
            GatewayError::InvalidToken
        })?;

        if now.timestamp() >= data.claims.exp {
            warn!("Token rejected: expired");
            return Err(GatewayError::InvalidToken);
        }

        Uuid::parse_str(&data.claims.sub).map_err(|_| {
            warn!("Token rejected: malformed subject");
            GatewayError::InvalidToken
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::minutes(10))
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let issuer = issuer();
        let account_id = Uuid::new_v4();
        let now = Utc::now();

        let token = issuer.issue(account_id, now).unwrap();
        assert_eq!(issuer.verify(&token, now).unwrap(), account_id);
    }

    #[test]
    fn test_expiry_boundary() {
        let issuer = issuer();
        let issued_at = Utc::now();
        let token = issuer.issue(Uuid::new_v4(), issued_at).unwrap();

        assert!(issuer
            .verify(&token, issued_at + Duration::seconds(599))
            .is_ok());
        assert!(matches!(
            issuer.verify(&token, issued_at + Duration::seconds(601)),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new("another-secret-another-secret-ab", Duration::minutes(10));
        let now = Utc::now();

        let token = other.issue(Uuid::new_v4(), now).unwrap();
        assert!(matches!(
            issuer.verify(&token, now),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = issuer();
        let now = Utc::now();

        assert!(issuer.verify("", now).is_err());
        assert!(issuer.verify("not.a.token", now).is_err());
        assert!(issuer.verify("eyJhbGciOiJIUzI1NiJ9.e30.sig", now).is_err());
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        #[derive(Serialize)]
        struct BadClaims {
            sub: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now();
        let claims = BadClaims {
            sub: "42".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(10)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            issuer().verify(&token, now),
            Err(GatewayError::InvalidToken)
        ));
    }
}
