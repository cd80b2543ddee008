//! Student registry

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use piaget_common::{ALL_CLASSES, PiagetError, StudentStatus, utils, validation};
use piaget_persistence::{
    NewStudent, PersistenceService, StudentInfo, StudentPatch, StudentPersistence,
};

/// Staff list filter; empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub name: Option<String>,
    pub class_label: Option<String>,
}

impl StudentFilter {
    pub fn matches(&self, student: &StudentInfo) -> bool {
        let name_ok = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => student
                .name
                .to_lowercase()
                .contains(&name.to_lowercase()),
            _ => true,
        };

        let class_ok = match self.class_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() && label != ALL_CLASSES => {
                student.class_label == label
            }
            _ => true,
        };

        name_ok && class_ok
    }
}

#[derive(Clone)]
pub struct StudentRegistry {
    persistence: Arc<dyn PersistenceService>,
}

impl StudentRegistry {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    pub async fn create(&self, form: &NewStudent) -> anyhow::Result<StudentInfo> {
        validation::validate_student_name(&form.name)
            .map_err(|_| PiagetError::IllegalArgument("student name is required".to_string()))?;
        check_national_id(&form.national_id)?;

        let student = NewStudent {
            name: form.name.trim().to_string(),
            national_id: form.national_id.trim().to_string(),
            birth_date: clean_birth_date(&form.birth_date)?,
            enrollment_code: form.enrollment_code.trim().to_string(),
            class_label: form.class_label.trim().to_string(),
            phase: form.phase.trim().to_string(),
            shift: form.shift.trim().to_string(),
            status: StudentStatus::Active,
        };

        let created = self.persistence.student_create(&student).await?;
        tracing::info!(student_id = %created.id, class_label = %created.class_label, "Student registered");
        Ok(created)
    }

    /// Students matching `filter`, sorted by name
    pub async fn list(&self, filter: &StudentFilter) -> anyhow::Result<Vec<StudentInfo>> {
        let mut students: Vec<StudentInfo> = self
            .persistence
            .student_find_all()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();

        students.sort_by_cached_key(|s| s.name.to_lowercase());
        Ok(students)
    }

    /// Distinct non-empty class labels, sorted
    pub async fn class_labels(&self) -> anyhow::Result<Vec<String>> {
        let labels: BTreeSet<String> = self
            .persistence
            .student_find_all()
            .await?
            .into_iter()
            .map(|s| s.class_label)
            .filter(|l| !l.is_empty())
            .collect();
        Ok(labels.into_iter().collect())
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<StudentInfo> {
        self.persistence
            .student_find_by_id(id)
            .await?
            .ok_or_else(|| PiagetError::StudentNotFound(id.to_string()).into())
    }

    pub async fn update(&self, id: &str, patch: &StudentPatch) -> anyhow::Result<StudentInfo> {
        let patch = clean_patch(patch)?;

        let updated = self
            .persistence
            .student_update(id, &patch)
            .await?
            .ok_or_else(|| PiagetError::StudentNotFound(id.to_string()))?;

        tracing::info!(student_id = %id, "Student updated");
        Ok(updated)
    }

    /// Remove a student. Recorded declarations are kept.
    pub async fn delete(&self, id: &str) -> anyhow::Result<()> {
        if !self.persistence.student_delete(id).await? {
            return Err(PiagetError::StudentNotFound(id.to_string()).into());
        }

        tracing::info!(student_id = %id, "Student deleted");
        Ok(())
    }
}

fn check_national_id(national_id: &str) -> anyhow::Result<()> {
    validation::validate_national_id(national_id).map_err(|_| {
        PiagetError::IllegalArgument(format!("invalid national id '{}'", national_id.trim()))
    })?;
    Ok(())
}

fn clean_birth_date(value: &str) -> anyhow::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    utils::normalize_birth_date(trimmed).ok_or_else(|| {
        PiagetError::IllegalArgument(format!("invalid birth date '{}'", trimmed)).into()
    })
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string())
}

fn clean_patch(patch: &StudentPatch) -> anyhow::Result<StudentPatch> {
    if let Some(name) = &patch.name {
        validation::validate_student_name(name)
            .map_err(|_| PiagetError::IllegalArgument("student name is required".to_string()))?;
    }
    if let Some(national_id) = &patch.national_id {
        check_national_id(national_id)?;
    }

    let birth_date = match &patch.birth_date {
        Some(value) => Some(clean_birth_date(value)?),
        None => None,
    };

    Ok(StudentPatch {
        name: trimmed(&patch.name),
        national_id: trimmed(&patch.national_id),
        birth_date,
        enrollment_code: trimmed(&patch.enrollment_code),
        class_label: trimmed(&patch.class_label),
        phase: trimmed(&patch.phase),
        shift: trimmed(&patch.shift),
        status: patch.status,
    })
}
