//! Authentication service implementations

pub mod auth;
pub mod session;
pub mod user;
