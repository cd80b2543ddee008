//! Monthly attendance recording
//!
//! A save computes presence and percentage from the school days and absences
//! of a month and writes the declaration for (student, month, year). Saving the
//! same month again replaces the previous values.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use piaget_common::{PiagetError, ReferenceMonth, validation};
use piaget_persistence::{
    DeclarationInfo, DeclarationPersistence, DeclarationUpsert, PersistenceService,
    StudentPersistence,
};

/// Presence derived from one month of school days
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attendance {
    pub presence: u32,
    pub percentage: f64,
}

/// Compute presence and percentage.
///
/// Fails when there are no school days, more than a month can hold, or more
/// absences than school days.
pub fn compute_attendance(school_days: u32, absences: u32) -> anyhow::Result<Attendance> {
    validation::validate_attendance(school_days, absences).map_err(|e| {
        PiagetError::IllegalArgument(format!(
            "invalid attendance ({} school days, {} absences): {}",
            school_days, absences, e.code
        ))
    })?;

    let presence = school_days - absences;
    Ok(Attendance {
        presence,
        percentage: presence as f64 / school_days as f64 * 100.0,
    })
}

/// Percentage as printed on documents: one decimal, comma separator.
pub fn display_percentage(percentage: f64) -> String {
    format!("{:.1}", percentage).replace('.', ",")
}

/// Staff input for one student and month
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: String,
    pub reference_month: ReferenceMonth,
    pub reference_year: i32,
    pub school_days: u32,
    #[serde(default)]
    pub absences: u32,
}

#[derive(Clone)]
pub struct AttendanceRecorder {
    persistence: Arc<dyn PersistenceService>,
}

impl AttendanceRecorder {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    /// Save attendance, replacing any earlier save for the same month
    pub async fn record(&self, entry: &AttendanceEntry) -> anyhow::Result<DeclarationInfo> {
        if entry.reference_year <= 0 {
            return Err(PiagetError::IllegalArgument(format!(
                "invalid reference year {}",
                entry.reference_year
            ))
            .into());
        }

        let attendance = compute_attendance(entry.school_days, entry.absences)?;

        let student = self
            .persistence
            .student_find_by_id(&entry.student_id)
            .await?
            .ok_or_else(|| PiagetError::StudentNotFound(entry.student_id.clone()))?;

        let declaration = self
            .persistence
            .declaration_upsert(&DeclarationUpsert {
                student_id: student.id,
                student_name: student.name,
                reference_month: entry.reference_month,
                reference_year: entry.reference_year,
                school_days: entry.school_days,
                presence: attendance.presence,
                percentage: attendance.percentage,
            })
            .await?;

        tracing::info!(
            student_id = %declaration.student_id,
            month = %declaration.reference_month,
            year = declaration.reference_year,
            presence = declaration.presence,
            school_days = declaration.school_days,
            "Attendance recorded"
        );

        Ok(declaration)
    }

    /// Declarations saved for a month, used to mark students already done
    pub async fn list_by_month(
        &self,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Vec<DeclarationInfo>> {
        self.persistence.declaration_find_by_month(month, year).await
    }

    pub async fn find(
        &self,
        student_id: &str,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<DeclarationInfo> {
        self.persistence
            .declaration_find_one(student_id, month, year)
            .await?
            .ok_or_else(|| {
                PiagetError::DeclarationNotFound(format!("{} {}/{}", student_id, month, year))
                    .into()
            })
    }

    pub async fn history(&self, student_id: &str) -> anyhow::Result<Vec<DeclarationInfo>> {
        self.persistence.declaration_find_by_student(student_id).await
    }
}
