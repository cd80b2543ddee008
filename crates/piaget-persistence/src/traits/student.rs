//! Student persistence trait

use async_trait::async_trait;

use crate::model::{NewStudent, StudentInfo, StudentPatch};

/// Student record storage operations
#[async_trait]
pub trait StudentPersistence: Send + Sync {
    /// Create a student; the store generates the id
    async fn student_create(&self, student: &NewStudent) -> anyhow::Result<StudentInfo>;

    /// All students, in no particular order
    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentInfo>>;

    /// Find a student by id
    async fn student_find_by_id(&self, id: &str) -> anyhow::Result<Option<StudentInfo>>;

    /// Find the earliest-created student matching both national ID and birth date exactly
    async fn student_find_by_identity(
        &self,
        national_id: &str,
        birth_date: &str,
    ) -> anyhow::Result<Option<StudentInfo>>;

    /// Apply a partial update; `None` when the student does not exist
    async fn student_update(
        &self,
        id: &str,
        patch: &StudentPatch,
    ) -> anyhow::Result<Option<StudentInfo>>;

    /// Delete a student; returns false when it did not exist.
    /// Declarations referencing the student are kept.
    async fn student_delete(&self, id: &str) -> anyhow::Result<bool>;
}
