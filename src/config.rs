use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Symmetric signing secret for bearer tokens. Rotating it invalidates
    /// every previously issued token.
    pub token_secret: String,
    pub token_ttl_minutes: i64,
    pub max_login_attempts: usize,
    pub lockout_window_secs: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuditConfig {
    pub log_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 4)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.token_ttl_minutes", 10)?
            .set_default("auth.max_login_attempts", 5)?
            .set_default("auth.lockout_window_secs", 300)?
            .set_default("audit.log_path", "security.log")?;

        // Add environment-specific config file if it exists
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("PAYMENT_GATEWAY")
                .separator("__")
                .list_separator(","),
        );

        // Special handling for common env vars
        if let Ok(db_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", db_url)?;
        }

        if let Ok(secret) = env::var("TOKEN_SECRET") {
            builder = builder.set_override("auth.token_secret", secret)?;
        }

        if let Ok(port) = env::var("PAYMENT_GATEWAY_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.database.url.is_empty() {
            return Err("Database URL is required".to_string());
        }

        if self.auth.token_secret.len() < 32 {
            return Err("Token secret must be at least 32 bytes".to_string());
        }

        if self.auth.token_ttl_minutes <= 0 {
            return Err("Token TTL must be positive".to_string());
        }

        if self.auth.max_login_attempts == 0 {
            return Err("Max login attempts cannot be 0".to_string());
        }

        if self.auth.lockout_window_secs <= 0 {
            return Err("Lockout window must be positive".to_string());
        }

        Ok(())
    }
}
