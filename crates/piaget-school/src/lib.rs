//! Piaget School - Domain services of the secretariat
//!
//! This crate provides:
//! - Student registry (create, list, update, delete)
//! - Attendance recording with one declaration per student and month
//! - Guardian declaration lookup
//! - Declaration PDF rendering
//! - Roster import from CSV spreadsheets

pub mod attendance;
pub mod import;
pub mod lookup;
pub mod pdf;
pub mod registry;

pub use attendance::{Attendance, AttendanceEntry, AttendanceRecorder, compute_attendance};
pub use import::{ImportMapping, ImportPlan, ImportReport, StudentField, import_students, plan_import};
pub use lookup::{DeclarationLookup, LookupOutcome};
pub use pdf::{AttendanceSummary, InstitutionInfo, declaration_file_name, render_declaration};
pub use registry::{StudentFilter, StudentRegistry};
