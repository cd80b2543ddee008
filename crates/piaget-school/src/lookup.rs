//! Guardian self-service declaration lookup
//!
//! A guardian identifies a student by national ID and birth date. The answer is
//! one of three outcomes; only a store failure is an error.

use std::sync::Arc;

use piaget_common::{NO_ATTENDANCE_MESSAGE, STUDENT_NOT_FOUND_MESSAGE, utils};
use piaget_persistence::{
    DeclarationInfo, DeclarationPersistence, PersistenceService, StudentInfo, StudentPersistence,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    StudentNotFound,
    NoAttendance,
    Found {
        student: StudentInfo,
        declaration: DeclarationInfo,
    },
}

impl LookupOutcome {
    /// Message shown to the guardian, if any
    pub fn message(&self) -> Option<&'static str> {
        match self {
            LookupOutcome::StudentNotFound => Some(STUDENT_NOT_FOUND_MESSAGE),
            LookupOutcome::NoAttendance => Some(NO_ATTENDANCE_MESSAGE),
            LookupOutcome::Found { .. } => None,
        }
    }
}

/// Most recent declaration by reference year, then month, then issue time
pub fn latest_declaration(declarations: Vec<DeclarationInfo>) -> Option<DeclarationInfo> {
    declarations
        .into_iter()
        .max_by_key(|d| (d.reference_year, d.reference_month.number(), d.issued_at))
}

#[derive(Clone)]
pub struct DeclarationLookup {
    persistence: Arc<dyn PersistenceService>,
}

impl DeclarationLookup {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    pub async fn lookup(&self, national_id: &str, birth_date: &str) -> anyhow::Result<LookupOutcome> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Ok(LookupOutcome::StudentNotFound);
        }
        let Some(birth_date) = utils::normalize_birth_date(birth_date) else {
            return Ok(LookupOutcome::StudentNotFound);
        };

        let Some(student) = self
            .persistence
            .student_find_by_identity(national_id, &birth_date)
            .await?
        else {
            tracing::info!("Guardian lookup matched no student");
            return Ok(LookupOutcome::StudentNotFound);
        };

        let declarations = self
            .persistence
            .declaration_find_by_student(&student.id)
            .await?;

        match latest_declaration(declarations) {
            Some(declaration) => {
                tracing::info!(
                    student_id = %student.id,
                    month = %declaration.reference_month,
                    year = declaration.reference_year,
                    "Guardian lookup found declaration"
                );
                Ok(LookupOutcome::Found {
                    student,
                    declaration,
                })
            }
            None => {
                tracing::info!(student_id = %student.id, "Guardian lookup found no attendance");
                Ok(LookupOutcome::NoAttendance)
            }
        }
    }
}
