// Staff-only access check for API handlers

use actix_web::{HttpMessage, HttpRequest, HttpResponse};

pub use piaget_auth::{AuthContext, SessionUser};

use crate::model::response::ErrorResult;

/// Signed-in staff member behind the request, or the 401 response to send
pub fn staff_session(req: &HttpRequest) -> Result<SessionUser, HttpResponse> {
    let auth_context: Option<AuthContext> = req.extensions().get::<AuthContext>().cloned();

    match auth_context {
        None => Err(ErrorResult::http_response_unauthorized(
            "no auth context found",
            req.path(),
        )),
        Some(ref ctx) if !ctx.token_provided => Err(ErrorResult::http_response_unauthorized(
            "no token provided",
            req.path(),
        )),
        Some(ref ctx) => ctx.session_user().ok_or_else(|| {
            ErrorResult::http_response_unauthorized(&ctx.jwt_error_string(), req.path())
        }),
    }
}

/// Evaluates to the signed-in [`SessionUser`] or returns 401 from the handler.
///
/// The enclosing handler must return `Result<HttpResponse, E>`.
#[macro_export]
macro_rules! secured {
    ($req: expr) => {
        match $crate::secured::staff_session(&$req) {
            Ok(__user) => __user,
            Err(__response) => return Ok(__response),
        }
    };
}
