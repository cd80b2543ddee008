//! Piaget Auth - Staff authentication and session state
//!
//! This crate provides:
//! - JWT token handling and sign-out revocation
//! - Staff account sign-in and first-admin bootstrap
//! - The explicit session context and the page gate built on it

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::*;
pub use service::session::{GateDecision, SessionContext, SessionGate, SessionStatus, View};
