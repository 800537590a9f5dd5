//! Append-only security event log.
//!
//! Every rejection and every authentication state change is recorded as a
//! structured JSON line. Events carry an identity (email or account id)
//! and a short detail string; plaintext passwords and raw bearer tokens
//! must never reach this log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AccountRegistered,
    RegistrationRejected,
    LoginSucceeded,
    LoginFailed,
    LoginThrottled,
    PaymentRecorded,
    PaymentRejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Email or account id the event concerns; never a secret.
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub struct AuditLog {
    writer: Mutex<File>,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                GatewayError::Internal(format!("failed to open audit log: {}", e))
            })?;

        Ok(AuditLog {
            writer: Mutex::new(file),
        })
    }

    pub async fn record(
        &self,
        event_type: AuditEventType,
        subject: &str,
        detail: Option<String>,
    ) -> Result<()> {
        let event = AuditEvent {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            subject: subject.to_string(),
            detail,
        };

        let line = serde_json::to_string(&event)
            .map_err(|e| GatewayError::Internal(format!("failed to encode audit event: {}", e)))?;

        let mut writer = self.writer.lock().await;
        writeln!(writer, "{}", line)
            .map_err(|e| GatewayError::Internal(format!("failed to write audit event: {}", e)))?;

        Ok(())
    }
}
