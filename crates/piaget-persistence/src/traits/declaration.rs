//! Declaration persistence trait

use async_trait::async_trait;

use piaget_common::ReferenceMonth;

use crate::model::{DeclarationInfo, DeclarationUpsert};

/// Attendance declaration storage operations
#[async_trait]
pub trait DeclarationPersistence: Send + Sync {
    /// Insert or replace the declaration for (student, month, year).
    ///
    /// An existing record keeps its id and gets a fresh `issued_at`.
    async fn declaration_upsert(
        &self,
        declaration: &DeclarationUpsert,
    ) -> anyhow::Result<DeclarationInfo>;

    /// Find the declaration for one student and month
    async fn declaration_find_one(
        &self,
        student_id: &str,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Option<DeclarationInfo>>;

    /// All declarations of a student
    async fn declaration_find_by_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<DeclarationInfo>>;

    /// All declarations for a reference month
    async fn declaration_find_by_month(
        &self,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Vec<DeclarationInfo>>;
}
