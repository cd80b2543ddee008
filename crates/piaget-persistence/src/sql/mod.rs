//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Implements the persistence traits with direct SeaORM queries against the
//! `students`, `declarations` and `users` tables.

use async_trait::async_trait;
use sea_orm::{
    prelude::Expr,
    sea_query::{Index, IndexCreateStatement, OnConflict, TableCreateStatement},
    *,
};

use piaget_common::{PiagetError, ReferenceMonth, StudentStatus};

use crate::entity::{declarations, students, users};
use crate::model::*;
use crate::traits::*;

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// by direct database queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the tables when they do not exist yet
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut students_table = schema.create_table_from_entity(students::Entity);
        students_table.if_not_exists();
        self.db
            .execute(backend.build(&students_table))
            .await
            .map_err(db_error)?;

        self.db
            .execute(backend.build(&declarations_table(&schema)))
            .await
            .map_err(db_error)?;
        // Tables created before the unique key existed; MySQL has no IF NOT EXISTS here
        if backend != DbBackend::MySql {
            let mut index = declaration_period_index();
            index.table(declarations::Entity).if_not_exists();
            self.db
                .execute(backend.build(&index))
                .await
                .map_err(db_error)?;
        }

        let mut users_table = schema.create_table_from_entity(users::Entity);
        users_table.if_not_exists();
        self.db
            .execute(backend.build(&users_table))
            .await
            .map_err(db_error)?;

        tracing::info!(backend = ?backend, "Database schema ensured");
        Ok(())
    }
}

fn db_error(e: DbErr) -> anyhow::Error {
    PiagetError::DatabaseError(e.to_string()).into()
}

/// One declaration per student, month and year
const DECLARATION_PERIOD_INDEX: &str = "uk_declarations_student_period";

fn declaration_period_index() -> IndexCreateStatement {
    Index::create()
        .name(DECLARATION_PERIOD_INDEX)
        .col(declarations::Column::StudentId)
        .col(declarations::Column::ReferenceMonth)
        .col(declarations::Column::ReferenceYear)
        .unique()
        .to_owned()
}

fn declarations_table(schema: &Schema) -> TableCreateStatement {
    let mut table = schema.create_table_from_entity(declarations::Entity);
    table
        .if_not_exists()
        .index(&mut declaration_period_index());
    table
}

/// Insert, or overwrite the counts of the row holding the same period.
/// The existing row keeps its id.
fn declaration_upsert_statement(
    declaration: &DeclarationUpsert,
    now: chrono::NaiveDateTime,
) -> anyhow::Result<Insert<declarations::ActiveModel>> {
    let entity = declarations::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        student_id: Set(declaration.student_id.clone()),
        student_name: Set(declaration.student_name.clone()),
        reference_month: Set(declaration.reference_month.number() as i32),
        reference_year: Set(declaration.reference_year),
        school_days: Set(i32::try_from(declaration.school_days)?),
        presence: Set(i32::try_from(declaration.presence)?),
        percentage: Set(declaration.percentage),
        gmt_create: Set(now),
    };

    Ok(declarations::Entity::insert(entity).on_conflict(
        OnConflict::columns([
            declarations::Column::StudentId,
            declarations::Column::ReferenceMonth,
            declarations::Column::ReferenceYear,
        ])
        .update_columns([
            declarations::Column::StudentName,
            declarations::Column::SchoolDays,
            declarations::Column::Presence,
            declarations::Column::Percentage,
            declarations::Column::GmtCreate,
        ])
        .to_owned(),
    ))
}

fn student_from_model(m: students::Model) -> StudentInfo {
    StudentInfo {
        id: m.id,
        name: m.name,
        national_id: m.national_id,
        birth_date: m.birth_date,
        enrollment_code: m.enrollment_code,
        class_label: m.class_label,
        phase: m.phase,
        shift: m.shift,
        status: m.status.parse().unwrap_or(StudentStatus::Active),
        created_time: m.gmt_create.and_utc().timestamp_millis(),
        modified_time: m.gmt_modified.and_utc().timestamp_millis(),
    }
}

fn declaration_from_model(m: declarations::Model) -> DeclarationInfo {
    DeclarationInfo {
        id: m.id,
        student_id: m.student_id,
        student_name: m.student_name,
        reference_month: ReferenceMonth::from_number(m.reference_month.max(0) as u32)
            .unwrap_or(ReferenceMonth::January),
        reference_year: m.reference_year,
        school_days: m.school_days.max(0) as u32,
        presence: m.presence.max(0) as u32,
        percentage: m.percentage,
        issued_at: m.gmt_create.and_utc().timestamp_millis(),
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Execute a simple query to verify connectivity
        users::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

// ============================================================================
// StudentPersistence implementation
// ============================================================================

#[async_trait]
impl StudentPersistence for ExternalDbPersistService {
    async fn student_create(&self, student: &NewStudent) -> anyhow::Result<StudentInfo> {
        let now = chrono::Utc::now().naive_utc();

        let entity = students::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(student.name.clone()),
            national_id: Set(student.national_id.clone()),
            birth_date: Set(student.birth_date.clone()),
            enrollment_code: Set(student.enrollment_code.clone()),
            class_label: Set(student.class_label.clone()),
            phase: Set(student.phase.clone()),
            shift: Set(student.shift.clone()),
            status: Set(student.status.as_str().to_string()),
            gmt_create: Set(now),
            gmt_modified: Set(now),
        };

        let model = entity.insert(&self.db).await.map_err(db_error)?;
        Ok(student_from_model(model))
    }

    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentInfo>> {
        let models = students::Entity::find()
            .order_by_asc(students::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(models.into_iter().map(student_from_model).collect())
    }

    async fn student_find_by_id(&self, id: &str) -> anyhow::Result<Option<StudentInfo>> {
        let model = students::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(model.map(student_from_model))
    }

    async fn student_find_by_identity(
        &self,
        national_id: &str,
        birth_date: &str,
    ) -> anyhow::Result<Option<StudentInfo>> {
        let model = students::Entity::find()
            .filter(students::Column::NationalId.eq(national_id))
            .filter(students::Column::BirthDate.eq(birth_date))
            .order_by_asc(students::Column::GmtCreate)
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(model.map(student_from_model))
    }

    async fn student_update(
        &self,
        id: &str,
        patch: &StudentPatch,
    ) -> anyhow::Result<Option<StudentInfo>> {
        let Some(existing) = students::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let mut merged = student_from_model(existing.clone());
        patch.apply(&mut merged);

        let mut entity: students::ActiveModel = existing.into();
        entity.name = Set(merged.name);
        entity.national_id = Set(merged.national_id);
        entity.birth_date = Set(merged.birth_date);
        entity.enrollment_code = Set(merged.enrollment_code);
        entity.class_label = Set(merged.class_label);
        entity.phase = Set(merged.phase);
        entity.shift = Set(merged.shift);
        entity.status = Set(merged.status.as_str().to_string());
        entity.gmt_modified = Set(chrono::Utc::now().naive_utc());

        let model = entity.update(&self.db).await.map_err(db_error)?;
        Ok(Some(student_from_model(model)))
    }

    async fn student_delete(&self, id: &str) -> anyhow::Result<bool> {
        let result = students::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// DeclarationPersistence implementation
// ============================================================================

#[async_trait]
impl DeclarationPersistence for ExternalDbPersistService {
    async fn declaration_upsert(
        &self,
        declaration: &DeclarationUpsert,
    ) -> anyhow::Result<DeclarationInfo> {
        declaration_upsert_statement(declaration, chrono::Utc::now().naive_utc())?
            .exec_without_returning(&self.db)
            .await
            .map_err(db_error)?;

        self.declaration_find_one(
            &declaration.student_id,
            declaration.reference_month,
            declaration.reference_year,
        )
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "declaration for student {} vanished after upsert",
                declaration.student_id
            )
        })
    }

    async fn declaration_find_one(
        &self,
        student_id: &str,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Option<DeclarationInfo>> {
        let model = declarations::Entity::find()
            .filter(declarations::Column::StudentId.eq(student_id))
            .filter(declarations::Column::ReferenceMonth.eq(month.number() as i32))
            .filter(declarations::Column::ReferenceYear.eq(year))
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(model.map(declaration_from_model))
    }

    async fn declaration_find_by_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<DeclarationInfo>> {
        let models = declarations::Entity::find()
            .filter(declarations::Column::StudentId.eq(student_id))
            .order_by_asc(declarations::Column::ReferenceYear)
            .order_by_asc(declarations::Column::ReferenceMonth)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(models.into_iter().map(declaration_from_model).collect())
    }

    async fn declaration_find_by_month(
        &self,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Vec<DeclarationInfo>> {
        let models = declarations::Entity::find()
            .filter(declarations::Column::ReferenceMonth.eq(month.number() as i32))
            .filter(declarations::Column::ReferenceYear.eq(year))
            .order_by_asc(declarations::Column::StudentName)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(models.into_iter().map(declaration_from_model).collect())
    }
}

// ============================================================================
// UserPersistence implementation
// ============================================================================

#[async_trait]
impl UserPersistence for ExternalDbPersistService {
    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        let user = users::Entity::find_by_id(email.to_string())
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(user.map(|u| UserInfo {
            email: u.email,
            password: u.password,
            enabled: u.enabled,
        }))
    }

    async fn user_create(
        &self,
        email: &str,
        password_hash: &str,
        enabled: bool,
    ) -> anyhow::Result<()> {
        let entity = users::ActiveModel {
            email: Set(email.to_string()),
            password: Set(password_hash.to_string()),
            enabled: Set(enabled),
        };

        users::Entity::insert(entity).exec(&self.db).await.map_err(db_error)?;
        Ok(())
    }

    async fn user_count(&self) -> anyhow::Result<u64> {
        Ok(users::Entity::find().count(&self.db).await.map_err(db_error)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert() -> DeclarationUpsert {
        DeclarationUpsert {
            student_id: "s-1".to_string(),
            student_name: "ANA CLARA".to_string(),
            reference_month: ReferenceMonth::April,
            reference_year: 2024,
            school_days: 20,
            presence: 18,
            percentage: 90.0,
        }
    }

    #[test]
    fn test_declarations_table_has_period_key() {
        for backend in [DbBackend::MySql, DbBackend::Postgres] {
            let sql = backend
                .build(&declarations_table(&Schema::new(backend)))
                .to_string();
            assert!(sql.contains(DECLARATION_PERIOD_INDEX), "{}", sql);
            assert!(sql.contains("UNIQUE"), "{}", sql);
        }
    }

    #[test]
    fn test_upsert_updates_on_period_conflict() {
        let now = chrono::Utc::now().naive_utc();

        let postgres = declaration_upsert_statement(&upsert(), now)
            .unwrap()
            .build(DbBackend::Postgres)
            .to_string();
        assert!(postgres.contains("ON CONFLICT"), "{}", postgres);
        assert!(postgres.contains("DO UPDATE SET"), "{}", postgres);
        assert!(
            postgres.contains(r#""school_days" = "excluded"."school_days""#),
            "{}",
            postgres
        );
        assert!(!postgres.contains(r#""id" = "excluded"."id""#), "{}", postgres);

        let mysql = declaration_upsert_statement(&upsert(), now)
            .unwrap()
            .build(DbBackend::MySql)
            .to_string();
        assert!(mysql.contains("ON DUPLICATE KEY UPDATE"), "{}", mysql);
    }

    #[test]
    fn test_db_error_is_typed() {
        let err = db_error(DbErr::Custom("connection reset".to_string()));
        assert!(matches!(
            err.downcast_ref::<PiagetError>(),
            Some(PiagetError::DatabaseError(message)) if message.contains("connection reset")
        ));
    }

    #[test]
    fn test_upsert_rejects_counts_outside_column_range() {
        let mut declaration = upsert();
        declaration.school_days = 3_000_000_000;
        assert!(declaration_upsert_statement(&declaration, chrono::Utc::now().naive_utc()).is_err());
    }
}
