use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_metrics(&registry).expect("metrics can be registered");
        registry
    };

    // Authentication metrics
    pub static ref REGISTRATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("registrations_total", "Total registration attempts"),
        &["outcome"]
    ).expect("metric can be created");

    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("login_attempts_total", "Total login attempts"),
        &["outcome"]
    ).expect("metric can be created");

    pub static ref TOKEN_VERIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("token_verifications_total", "Total bearer token verifications"),
        &["outcome"]
    ).expect("metric can be created");

    // Ledger metrics
    pub static ref PAYMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("payments_total", "Total payment recording attempts"),
        &["outcome"]
    ).expect("metric can be created");

    // Storage metrics
    pub static ref STORAGE_RETRIES_TOTAL: IntCounter = IntCounter::new(
        "storage_retries_total",
        "Total storage operation retries"
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(REGISTRATIONS_TOTAL.clone()))?;
    registry.register(Box::new(LOGIN_ATTEMPTS_TOTAL.clone()))?;
    registry.register(Box::new(TOKEN_VERIFICATIONS_TOTAL.clone()))?;
    registry.register(Box::new(PAYMENTS_TOTAL.clone()))?;
    registry.register(Box::new(STORAGE_RETRIES_TOTAL.clone()))?;
    Ok(())
}

/// Export all registered metrics in Prometheus text format
pub fn export() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics not valid UTF-8: {}", e)))
}
