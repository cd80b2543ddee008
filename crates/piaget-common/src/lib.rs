//! Piaget Common - Shared types and utilities
//!
//! This crate provides:
//! - Error types and API error codes
//! - Reference months, student status, and label lists
//! - Input validation and date/text helpers

pub mod error;
pub mod model;
pub mod utils;
pub mod validation;

pub use error::{ErrorCode, PiagetError};
pub use model::{
    ALL_CLASSES, DEFAULT_SCHOOL_DAYS, PHASES, ReferenceMonth, SHIFTS, StudentStatus,
};

/// Institution shown on documents when none is configured.
pub const DEFAULT_INSTITUTION_NAME: &str = "CMEI Jean Piaget";

/// City printed next to the issue date.
pub const DEFAULT_INSTITUTION_CITY: &str = "Manaus";

/// Guardian lookup found no student for the given national ID and birth date.
pub const STUDENT_NOT_FOUND_MESSAGE: &str = "Dados incorretos ou aluno não cadastrado.";

/// Guardian lookup found the student but no attendance was recorded.
pub const NO_ATTENDANCE_MESSAGE: &str =
    "Nenhuma frequência foi lançada para este aluno ainda. Entre em contato com a secretaria.";

/// Staff sign-in failed.
pub const LOGIN_FAILED_MESSAGE: &str = "E-mail ou senha incorretos.";

/// Spreadsheet could not be processed.
pub const IMPORT_FAILED_MESSAGE: &str = "Erro ao processar planilha.";
