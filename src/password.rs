use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

use crate::errors::{GatewayError, Result};

/// Hash a plaintext password with a fresh random salt. Hashing the same
/// plaintext twice yields different strings.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            GatewayError::Internal("password hashing failed".to_string())
        })?;

    Ok(hash.to_string())
}

/// Constant-time verification against a stored hash. A malformed stored
/// hash verifies as false rather than erroring.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
