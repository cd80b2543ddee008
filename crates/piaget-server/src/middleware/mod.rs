// HTTP middleware implementations

pub mod auth; // Token resolution and session context
pub mod rate_limit; // Per-client request limits and attempt lockouts
