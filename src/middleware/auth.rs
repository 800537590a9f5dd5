use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::services::GatewayService;

/// Account id resolved from a verified bearer token, available to handlers
/// through request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedAccount(pub Uuid);

/// Bearer-token gate for protected routes. A missing header, a malformed
/// header, and a failed verification all produce the same `InvalidToken`
/// response; only the logs distinguish them.
pub struct BearerAuth {
    service: Arc<GatewayService>,
}

impl BearerAuth {
    pub fn new(service: Arc<GatewayService>) -> Self {
        Self { service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
            gateway: self.service.clone(),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
    gateway: Arc<GatewayService>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        let token = match auth_header {
            Some(value) => {
                let auth_str = value.to_str().unwrap_or("");
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    token
                } else {
                    warn!("Rejected request with malformed Authorization header");
                    return Box::pin(async { Err(GatewayError::InvalidToken.into()) });
                }
            }
            None => {
                warn!("Rejected request with missing Authorization header");
                return Box::pin(async { Err(GatewayError::InvalidToken.into()) });
            }
        };

        match self.gateway.authorize(token, Utc::now()) {
            Ok(account_id) => {
                req.extensions_mut().insert(AuthenticatedAccount(account_id));

                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}
