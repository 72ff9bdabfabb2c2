use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_access_token;
use crate::auth::ACCESS_TOKEN_COOKIE;
use crate::config::Config;

/// Why a presented access token was not accepted.
///
/// Inserted into request extensions in place of [`Claims`](crate::auth::Claims) so the
/// extractors can tell "no token" apart from "bad token".
#[derive(Debug, Clone)]
pub struct AuthFailure(pub String);

/// Decodes the access token from the `accessToken` cookie or an
/// `Authorization: Bearer` header.
///
/// The middleware never rejects a request. Routes that require a user take the
/// [`AuthenticatedUser`](crate::auth::extractors::AuthenticatedUser) extractor, which
/// turns missing claims into a 401; public routes with optional identity take
/// [`MaybeUser`](crate::auth::extractors::MaybeUser).
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn presented_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = presented_token(&req) {
            let verified = match req.app_data::<web::Data<Config>>() {
                Some(config) => verify_access_token(&token, config),
                None => Err(crate::error::AppError::InternalServerError(
                    "Config is not registered as app data".into(),
                )),
            };

            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                }
                Err(err) => {
                    log::warn!("Rejected access token on {}: {}", req.path(), err);
                    req.extensions_mut().insert(AuthFailure(err.to_string()));
                }
            }
        }

        Box::pin(self.service.call(req))
    }
}
