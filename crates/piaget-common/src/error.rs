//! Error types and error codes for Piaget
//!
//! This module defines:
//! - `PiagetError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum PiagetError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("student '{0}' not exist")]
    StudentNotFound(String),

    #[error("declaration not exist: {0}")]
    DeclarationNotFound(String),

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("{0}")]
    AlreadyInitialized(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("import error: {0}")]
    ImportError(String),

    #[error("render error: {0}")]
    RenderError(String),
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

// General success and error codes
pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const TOO_MANY_REQUESTS: ErrorCode<'static> = ErrorCode {
    code: 10003,
    message: "too many requests",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

// Student registry and attendance
pub const STUDENT_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 22000,
    message: "student not found",
};

pub const DECLARATION_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 22001,
    message: "declaration not found",
};

pub const NO_ATTENDANCE: ErrorCode<'static> = ErrorCode {
    code: 22002,
    message: "no attendance recorded",
};

// Import and rendering
pub const IMPORT_FILE_EMPTY: ErrorCode<'static> = ErrorCode {
    code: 23000,
    message: "imported file data is empty",
};

pub const IMPORT_FILE_INVALID: ErrorCode<'static> = ErrorCode {
    code: 23001,
    message: "imported file is invalid",
};

pub const RENDER_FAILED: ErrorCode<'static> = ErrorCode {
    code: 23002,
    message: "document rendering failed",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
