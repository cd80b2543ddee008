// Piaget server: HTTP surface for the student registry, attendance
// declarations and the guardian lookup

pub mod api; // HTTP handlers
pub mod error; // Error to response mapping
pub mod middleware; // Authentication and rate limiting
pub mod model; // Configuration, state and response types
pub mod secured; // Staff-only access check
pub mod startup; // Logging, HTTP server and shutdown

pub use model::{AppState, Configuration, ErrorResult};
