//! Staff sign-in, sign-out and session status

use actix_web::{HttpMessage, HttpRequest, HttpResponse, Scope, get, post, web};
use serde::{Deserialize, Serialize};

use piaget_auth::{
    AUTHORIZATION_HEADER, AuthContext, SessionContext, SessionStatus, TOKEN_PREFIX,
    service::user,
};
use piaget_common::{LOGIN_FAILED_MESSAGE, PiagetError};

use crate::{
    error::AppError,
    middleware::rate_limit::too_many_requests,
    model::{AppState, response::Result},
    secured,
};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&SessionStatus> for SessionView {
    fn from(status: &SessionStatus) -> Self {
        let label = match status {
            SessionStatus::Unresolved => "unresolved",
            SessionStatus::Authenticated(_) => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
        };
        SessionView {
            status: label.to_string(),
            email: status.user().map(|u| u.email.clone()),
        }
    }
}

/// Session resolved by the authentication middleware for this request
pub(crate) fn request_session(req: &HttpRequest) -> SessionContext {
    req.extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default()
}

#[post("/login")]
async fn login(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> std::result::Result<HttpResponse, AppError> {
    let client = data.client_key(&req);

    let (allowed, _, lockout_secs) = data.login_limiter.check_attempt(&client);
    if !allowed {
        tracing::warn!(client = %client, "Sign-in refused: client locked out");
        return Ok(too_many_requests(
            data.login_limiter.config().max_attempts,
            lockout_secs,
        ));
    }

    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(PiagetError::AuthError(LOGIN_FAILED_MESSAGE.to_string()).into());
    }

    let result = user::sign_in(
        data.persistence(),
        &form.email,
        &form.password,
        &data.token_secret_key(),
        data.configuration.auth_token_expire_seconds(),
    )
    .await;

    match result {
        Ok(login_result) => {
            data.login_limiter.record_success(&client);
            request_session(&req).signed_in(piaget_auth::SessionUser {
                email: login_result.email.clone(),
            });

            Ok(HttpResponse::Ok()
                .append_header((
                    AUTHORIZATION_HEADER,
                    format!("{}{}", TOKEN_PREFIX, login_result.access_token),
                ))
                .json(Result::success(login_result)))
        }
        Err(e) => {
            if matches!(
                e.downcast_ref::<PiagetError>(),
                Some(PiagetError::AuthError(_))
            ) {
                data.login_limiter.record_attempt(&client);
            }
            Err(e.into())
        }
    }
}

#[post("/logout")]
async fn logout(req: HttpRequest) -> std::result::Result<HttpResponse, AppError> {
    let session_user = secured!(req);

    let token = req
        .extensions()
        .get::<AuthContext>()
        .and_then(|ctx| ctx.token.clone());

    if let Some(token) = token {
        user::sign_out(&token);
    }
    request_session(&req).signed_out();

    tracing::debug!(email = %session_user.email, "Session ended");
    Ok(Result::<bool>::http_success(true))
}

/// First staff account; refused once any account exists
#[post("/admin")]
async fn init_admin(
    data: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> std::result::Result<HttpResponse, AppError> {
    user::init_admin(data.persistence(), &form.email, &form.password).await?;

    Ok(Result::<String>::http_success(user::normalize_email(
        &form.email,
    )))
}

#[get("/session")]
async fn session(req: HttpRequest) -> HttpResponse {
    let status = request_session(&req).status();
    Result::<SessionView>::http_success(SessionView::from(&status))
}

pub fn routes() -> Scope {
    web::scope("/v1/auth")
        .service(login)
        .service(logout)
        .service(init_admin)
        .service(session)
}
