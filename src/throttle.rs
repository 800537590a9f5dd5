//! Sliding-window lockout for failed login attempts.
//!
//! Tracks failure timestamps per identity; once the count inside the
//! trailing window reaches the threshold, further attempts are rejected
//! until the oldest qualifying failure ages out. There is no explicit
//! unlock timer. State is process-lifetime only; a restart clears it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct LoginThrottle {
    max_failures: usize,
    window: Duration,
    failures: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl LoginThrottle {
    pub fn new(max_failures: usize, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Prune entries that have aged out of the window, then check the
    /// remaining count against the threshold. Prune-then-count runs under
    /// one lock acquisition so concurrent checks for the same identity
    /// cannot interleave.
    pub async fn is_locked(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let mut failures = self.failures.write().await;
        let Some(entries) = failures.get_mut(identity) else {
            return false;
        };

        entries.retain(|ts| now - *ts < self.window);
        if entries.is_empty() {
            failures.remove(identity);
            return false;
        }

        entries.len() >= self.max_failures
    }

    /// Record a failed attempt for an identity. Recorded for unknown
    /// identities too, so throttling cannot be used to probe which
    /// accounts exist.
    pub async fn record_failure(&self, identity: &str, now: DateTime<Utc>) {
        let mut failures = self.failures.write().await;
        failures.entry(identity.to_string()).or_default().push(now);
    }

    /// Clear an identity's failure history (called on successful login).
    pub async fn reset(&self, identity: &str) {
        let mut failures = self.failures.write().await;
        failures.remove(identity);
    }

    /// Drop identities whose failures have all aged out of the window.
    pub async fn cleanup(&self, now: DateTime<Utc>) {
        let mut failures = self.failures.write().await;
        failures.retain(|_, entries| {
            entries.retain(|ts| now - *ts < self.window);
            !entries.is_empty()
        });

        info!("Login throttle cleanup: {} identities tracked", failures.len());
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>, interval: std::time::Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                self.cleanup(Utc::now()).await;
            }
        });
    }
}
