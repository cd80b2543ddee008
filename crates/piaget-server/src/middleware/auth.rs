// Authentication middleware for Actix-web
// Resolves the request token once and exposes the result to handlers as an
// AuthContext and a resolved SessionContext

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web::Data,
};
use futures::future::LocalBoxFuture;

use piaget_auth::{
    ACCESS_TOKEN_PARAM, AUTHORIZATION_HEADER, AuthContext, SessionContext, TOKEN_PREFIX,
    service::auth,
};

use crate::model::AppState;

// Authentication middleware transformer
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddleware { service })
    }
}

pub struct AuthenticationMiddleware<S> {
    service: S,
}

/// Extract token from request using 3 sources in priority order:
/// 1. `accessToken` HTTP header
/// 2. `Authorization: Bearer <token>` header
/// 3. `accessToken` query parameter
fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(header_val) = req.headers().get(ACCESS_TOKEN_PARAM)
        && let Ok(s) = header_val.to_str()
    {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    if let Some(header_val) = req.headers().get(AUTHORIZATION_HEADER)
        && let Ok(s) = header_val.to_str()
    {
        if let Some(token) = s.trim().strip_prefix(TOKEN_PREFIX) {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=')
                && key == ACCESS_TOKEN_PARAM
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Check a token against the configured secret and the sign-out list
fn resolve_auth_context(token: Option<String>, secret_key: &str) -> AuthContext {
    let mut auth_context = AuthContext::default();

    let Some(token) = token else {
        return auth_context;
    };
    auth_context.token_provided = true;

    if auth::is_revoked(&token) {
        auth_context.revoked = true;
    } else {
        match auth::decode_jwt_token_cached(&token, secret_key) {
            Ok(token_data) => auth_context.email = token_data.claims.sub,
            Err(err) => auth_context.jwt_error = Some(err),
        }
    }

    auth_context.token = Some(token);
    auth_context
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if Method::OPTIONS != *req.method() {
            let token = extract_token(&req);

            let auth_context = match req.app_data::<Data<AppState>>() {
                Some(app_state) => resolve_auth_context(token, &app_state.token_secret_key()),
                None => {
                    tracing::error!("AppState not found in request app_data");
                    AuthContext::default()
                }
            };

            if auth_context.token_provided && !auth_context.is_authenticated() {
                tracing::debug!(
                    path = %req.path(),
                    reason = %auth_context.jwt_error_string(),
                    "Request token rejected"
                );
            }

            let session = SessionContext::resolved_with(auth_context.session_user());

            req.extensions_mut().insert(auth_context);
            req.extensions_mut().insert(session);
        }

        let res = self.service.call(req);

        Box::pin(async move { res.await.map(ServiceResponse::map_into_left_body) })
    }
}
