use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many login attempts. Try again later")]
    TooManyAttempts,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Duplicate payment detected")]
    DuplicateTransaction,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service temporarily unavailable")]
    StorageUnavailable,

    #[error("Internal server error")]
    Internal(String),
}

// Unique-violation conflicts raised by the storage constraints are the
// canonical duplicate-detection path; everything else the store reports is
// collapsed into `StorageUnavailable` so callers never see its internals.
impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or_default();
                if constraint.contains("email") {
                    return GatewayError::DuplicateEmail;
                }
                if constraint.contains("idempotency") {
                    return GatewayError::DuplicateTransaction;
                }
            }
        }
        tracing::error!("Storage error: {}", err);
        GatewayError::StorageUnavailable
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::DuplicateEmail => StatusCode::CONFLICT,
            GatewayError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            GatewayError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidToken => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidAmount => StatusCode::BAD_REQUEST,
            GatewayError::DuplicateTransaction => StatusCode::CONFLICT,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl GatewayError {
    fn error_type(&self) -> &str {
        match self {
            GatewayError::DuplicateEmail => "duplicate_email",
            GatewayError::InvalidCredentials => "invalid_credentials",
            GatewayError::TooManyAttempts => "rate_limit",
            GatewayError::InvalidToken => "invalid_token",
            GatewayError::InvalidAmount => "invalid_amount",
            GatewayError::DuplicateTransaction => "duplicate_transaction",
            GatewayError::Validation(_) => "validation_error",
            GatewayError::StorageUnavailable => "service_unavailable",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}
