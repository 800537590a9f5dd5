use crate::errors::GatewayError;
use crate::metrics;
use crate::middleware::auth::{AuthenticatedAccount, BearerAuth};
use crate::models::{LoginRequest, PaymentRequest, RegisterRequest};
use crate::services::GatewayService;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "payment-gateway",
        "version": "1.0.0"
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics_export() -> Result<HttpResponse, GatewayError> {
    let body = metrics::export()
        .map_err(|e| GatewayError::Internal(format!("failed to export metrics: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

/// Register a new account
pub async fn register(
    service: web::Data<Arc<GatewayService>>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, GatewayError> {
    let response = service.register(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Authenticate and issue a bearer token
pub async fn login(
    service: web::Data<Arc<GatewayService>>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, GatewayError> {
    let response = service.login(request.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Record a payment for the authenticated account
pub async fn record_payment(
    service: web::Data<Arc<GatewayService>>,
    account: web::ReqData<AuthenticatedAccount>,
    request: web::Json<PaymentRequest>,
) -> Result<HttpResponse, GatewayError> {
    let response = service
        .record_payment(account.into_inner().0, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// List the authenticated account's transactions
pub async fn list_transactions(
    service: web::Data<Arc<GatewayService>>,
    account: web::ReqData<AuthenticatedAccount>,
) -> Result<HttpResponse, GatewayError> {
    let transactions = service.list_transactions(account.into_inner().0).await?;

    Ok(HttpResponse::Ok().json(json!({
        "transactions": transactions
    })))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig, service: Arc<GatewayService>) {
    cfg.service(
        web::scope("/api/v1")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .service(
                web::scope("")
                    .wrap(BearerAuth::new(service))
                    .route("/payments", web::post().to(record_payment))
                    .route("/transactions", web::get().to(list_transactions)),
            ),
    )
    .route("/health", web::get().to(health_check))
    .route("/metrics", web::get().to(metrics_export));
}
