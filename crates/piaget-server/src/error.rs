// Error handling for HTTP handlers
// Maps domain errors to status codes and the `{code, message, data}` envelope

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;

pub use piaget_common::error::{
    ACCESS_DENIED, DATA_ACCESS_ERROR, DECLARATION_NOT_FOUND, IMPORT_FILE_EMPTY,
    IMPORT_FILE_INVALID, NO_ATTENDANCE, PARAMETER_MISSING, PARAMETER_VALIDATE_ERROR,
    RENDER_FAILED, RESOURCE_CONFLICT, RESOURCE_NOT_FOUND, SERVER_ERROR, STUDENT_NOT_FOUND,
    SUCCESS, TOO_MANY_REQUESTS,
};
pub use piaget_common::error::{ErrorCode, PiagetError};

use crate::model::response::Result as ApiResult;

// Local wrapper so anyhow errors can implement actix-web's ResponseError
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<PiagetError> for AppError {
    fn from(value: PiagetError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

fn error_response(status: u16, code: &ErrorCode, message: &str) -> HttpResponse {
    ApiResult::<String>::http_response(status, code.code, message.to_string(), String::new())
}

impl actix_web::error::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self.downcast_ref::<PiagetError>() {
            Some(PiagetError::IllegalArgument(message)) => {
                error_response(400, &PARAMETER_VALIDATE_ERROR, message)
            }
            Some(PiagetError::StudentNotFound(id)) => error_response(
                404,
                &STUDENT_NOT_FOUND,
                &format!("student '{}' not exist", id),
            ),
            Some(PiagetError::DeclarationNotFound(message)) => {
                error_response(404, &DECLARATION_NOT_FOUND, message)
            }
            Some(PiagetError::AuthError(message)) => error_response(401, &ACCESS_DENIED, message),
            Some(PiagetError::AlreadyInitialized(message)) => {
                error_response(409, &RESOURCE_CONFLICT, message)
            }
            Some(PiagetError::DatabaseError(message)) => {
                tracing::error!("Database error: {}", message);
                error_response(500, &DATA_ACCESS_ERROR, message)
            }
            Some(PiagetError::ImportError(message)) => {
                error_response(400, &IMPORT_FILE_INVALID, message)
            }
            Some(PiagetError::RenderError(message)) => {
                tracing::error!("Declaration rendering failed: {}", message);
                error_response(500, &RENDER_FAILED, message)
            }
            None => {
                tracing::error!("Unhandled error: {:#}", self.inner);
                error_response(500, &SERVER_ERROR, &self.inner.to_string())
            }
        }
    }
}
