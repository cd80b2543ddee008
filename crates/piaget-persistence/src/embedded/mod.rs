// Embedded persistence backend using RocksDB
// Provides single-node storage without an external database

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};

use piaget_common::{PiagetError, ReferenceMonth, StudentStatus};

use crate::model::{
    DeclarationInfo, DeclarationUpsert, NewStudent, StorageMode, StudentInfo, StudentPatch,
    UserInfo,
};
use crate::traits::PersistenceService;
use crate::traits::declaration::DeclarationPersistence;
use crate::traits::student::StudentPersistence;
use crate::traits::user::UserPersistence;

pub const CF_STUDENTS: &str = "students";
pub const CF_DECLARATIONS: &str = "declarations";
pub const CF_USERS: &str = "users";

const KEY_SEPARATOR: &str = "@@";

fn store_error(op: &str, e: impl std::fmt::Display) -> PiagetError {
    PiagetError::DatabaseError(format!("RocksDB {} error: {}", op, e))
}

/// Standalone embedded persistence using RocksDB
///
/// Documents are stored as JSON values, one column family per collection.
/// Declarations are keyed by `student_id@@year@@month`, which makes a second
/// save for the same month overwrite the first.
pub struct EmbeddedPersistService {
    db: Arc<DB>,
}

impl EmbeddedPersistService {
    /// Open (or create) the database under `path`
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_STUDENTS, cf_opts.clone()),
            ColumnFamilyDescriptor::new(CF_DECLARATIONS, cf_opts.clone()),
            ColumnFamilyDescriptor::new(CF_USERS, cf_opts),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cfs)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        tracing::info!(path = %path.as_ref().display(), "Embedded storage opened");

        Ok(Self::new(Arc::new(db)))
    }

    /// Create from a raw RocksDB instance that already has the column families
    pub fn new(db: Arc<DB>) -> Self {
        Self { db }
    }

    /// Get a column family handle
    fn cf(&self, name: &str) -> anyhow::Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| anyhow::anyhow!("Column family '{}' not found", name))
    }

    /// Read a JSON value from a column family
    fn get_json(&self, cf_name: &str, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let cf = self.cf(cf_name)?;
        match self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| store_error("get", e))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write a JSON value to a column family
    fn put_json(&self, cf_name: &str, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(cf, key.as_bytes(), value.to_string().as_bytes())
            .map_err(|e| store_error("put", e).into())
    }

    /// Delete a key from a column family
    fn delete_key(&self, cf_name: &str, key: &str) -> anyhow::Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .delete_cf(cf, key.as_bytes())
            .map_err(|e| store_error("delete", e).into())
    }

    /// Collect every JSON value whose key starts with `prefix` (all values for an empty prefix)
    fn scan_json(&self, cf_name: &str, prefix: &str) -> anyhow::Result<Vec<serde_json::Value>> {
        let cf = self.cf(cf_name)?;
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(prefix.as_bytes(), Direction::Forward)
        };

        let mut results = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            let (key, value) = item.map_err(|e| store_error("iterator", e))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            results.push(serde_json::from_slice(&value)?);
        }

        Ok(results)
    }

    /// Key of the single declaration a student may have for a month
    pub fn declaration_key(student_id: &str, month: ReferenceMonth, year: i32) -> String {
        format!(
            "{}{}{:04}{}{:02}",
            student_id,
            KEY_SEPARATOR,
            year,
            KEY_SEPARATOR,
            month.number()
        )
    }

    fn declaration_prefix(student_id: &str) -> String {
        format!("{}{}", student_id, KEY_SEPARATOR)
    }

    fn student_to_json(student: &StudentInfo) -> serde_json::Value {
        serde_json::json!({
            "id": student.id,
            "name": student.name,
            "national_id": student.national_id,
            "birth_date": student.birth_date,
            "enrollment_code": student.enrollment_code,
            "class_label": student.class_label,
            "phase": student.phase,
            "shift": student.shift,
            "status": student.status.as_str(),
            "created_time": student.created_time,
            "modified_time": student.modified_time,
        })
    }

    /// Convert a JSON value from RocksDB to StudentInfo
    pub fn json_to_student(v: &serde_json::Value) -> StudentInfo {
        StudentInfo {
            id: v["id"].as_str().unwrap_or("").to_string(),
            name: v["name"].as_str().unwrap_or("").to_string(),
            national_id: v["national_id"].as_str().unwrap_or("").to_string(),
            birth_date: v["birth_date"].as_str().unwrap_or("").to_string(),
            enrollment_code: v["enrollment_code"].as_str().unwrap_or("").to_string(),
            class_label: v["class_label"].as_str().unwrap_or("").to_string(),
            phase: v["phase"].as_str().unwrap_or("").to_string(),
            shift: v["shift"].as_str().unwrap_or("").to_string(),
            status: v["status"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(StudentStatus::Active),
            created_time: v["created_time"].as_i64().unwrap_or(0),
            modified_time: v["modified_time"].as_i64().unwrap_or(0),
        }
    }

    /// Convert a JSON value from RocksDB to DeclarationInfo
    pub fn json_to_declaration(v: &serde_json::Value) -> DeclarationInfo {
        DeclarationInfo {
            id: v["id"].as_str().unwrap_or("").to_string(),
            student_id: v["student_id"].as_str().unwrap_or("").to_string(),
            student_name: v["student_name"].as_str().unwrap_or("").to_string(),
            reference_month: v["reference_month"]
                .as_u64()
                .and_then(|n| ReferenceMonth::from_number(n as u32))
                .unwrap_or(ReferenceMonth::January),
            reference_year: v["reference_year"].as_i64().unwrap_or(0) as i32,
            school_days: v["school_days"].as_u64().unwrap_or(0) as u32,
            presence: v["presence"].as_u64().unwrap_or(0) as u32,
            percentage: v["percentage"].as_f64().unwrap_or(0.0),
            issued_at: v["issued_at"].as_i64().unwrap_or(0),
        }
    }

    /// Convert JSON to UserInfo
    pub fn json_to_user(v: &serde_json::Value) -> UserInfo {
        UserInfo {
            email: v["email"].as_str().unwrap_or("").to_string(),
            password: v["password_hash"].as_str().unwrap_or("").to_string(),
            enabled: v["enabled"].as_bool().unwrap_or(true),
        }
    }
}

#[async_trait]
impl StudentPersistence for EmbeddedPersistService {
    async fn student_create(&self, student: &NewStudent) -> anyhow::Result<StudentInfo> {
        let now = chrono::Utc::now().timestamp_millis();
        let info = StudentInfo {
            id: uuid::Uuid::new_v4().to_string(),
            name: student.name.clone(),
            national_id: student.national_id.clone(),
            birth_date: student.birth_date.clone(),
            enrollment_code: student.enrollment_code.clone(),
            class_label: student.class_label.clone(),
            phase: student.phase.clone(),
            shift: student.shift.clone(),
            status: student.status,
            created_time: now,
            modified_time: now,
        };

        self.put_json(CF_STUDENTS, &info.id, &Self::student_to_json(&info))?;
        Ok(info)
    }

    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentInfo>> {
        let values = self.scan_json(CF_STUDENTS, "")?;
        Ok(values.iter().map(Self::json_to_student).collect())
    }

    async fn student_find_by_id(&self, id: &str) -> anyhow::Result<Option<StudentInfo>> {
        let json = self.get_json(CF_STUDENTS, id)?;
        Ok(json.as_ref().map(Self::json_to_student))
    }

    async fn student_find_by_identity(
        &self,
        national_id: &str,
        birth_date: &str,
    ) -> anyhow::Result<Option<StudentInfo>> {
        let values = self.scan_json(CF_STUDENTS, "")?;
        Ok(values
            .iter()
            .filter(|v| {
                v["national_id"].as_str() == Some(national_id)
                    && v["birth_date"].as_str() == Some(birth_date)
            })
            .map(Self::json_to_student)
            .min_by_key(|s| s.created_time))
    }

    async fn student_update(
        &self,
        id: &str,
        patch: &StudentPatch,
    ) -> anyhow::Result<Option<StudentInfo>> {
        let mut student = match self.get_json(CF_STUDENTS, id)? {
            Some(ref v) => Self::json_to_student(v),
            None => return Ok(None),
        };

        patch.apply(&mut student);
        student.modified_time = chrono::Utc::now().timestamp_millis();

        self.put_json(CF_STUDENTS, id, &Self::student_to_json(&student))?;
        Ok(Some(student))
    }

    async fn student_delete(&self, id: &str) -> anyhow::Result<bool> {
        if self.get_json(CF_STUDENTS, id)?.is_none() {
            return Ok(false);
        }

        self.delete_key(CF_STUDENTS, id)?;
        Ok(true)
    }
}

#[async_trait]
impl DeclarationPersistence for EmbeddedPersistService {
    async fn declaration_upsert(
        &self,
        declaration: &DeclarationUpsert,
    ) -> anyhow::Result<DeclarationInfo> {
        let key = Self::declaration_key(
            &declaration.student_id,
            declaration.reference_month,
            declaration.reference_year,
        );
        let now = chrono::Utc::now().timestamp_millis();

        let id = match self.get_json(CF_DECLARATIONS, &key)? {
            Some(existing) => existing["id"].as_str().unwrap_or("").to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let value = serde_json::json!({
            "id": id,
            "student_id": declaration.student_id,
            "student_name": declaration.student_name,
            "reference_month": declaration.reference_month.number(),
            "reference_year": declaration.reference_year,
            "school_days": declaration.school_days,
            "presence": declaration.presence,
            "percentage": declaration.percentage,
            "issued_at": now,
        });

        self.put_json(CF_DECLARATIONS, &key, &value)?;
        Ok(Self::json_to_declaration(&value))
    }

    async fn declaration_find_one(
        &self,
        student_id: &str,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Option<DeclarationInfo>> {
        let key = Self::declaration_key(student_id, month, year);
        let json = self.get_json(CF_DECLARATIONS, &key)?;
        Ok(json.as_ref().map(Self::json_to_declaration))
    }

    async fn declaration_find_by_student(
        &self,
        student_id: &str,
    ) -> anyhow::Result<Vec<DeclarationInfo>> {
        let values = self.scan_json(CF_DECLARATIONS, &Self::declaration_prefix(student_id))?;
        Ok(values.iter().map(Self::json_to_declaration).collect())
    }

    async fn declaration_find_by_month(
        &self,
        month: ReferenceMonth,
        year: i32,
    ) -> anyhow::Result<Vec<DeclarationInfo>> {
        let values = self.scan_json(CF_DECLARATIONS, "")?;
        Ok(values
            .iter()
            .map(Self::json_to_declaration)
            .filter(|d| d.reference_month == month && d.reference_year == year)
            .collect())
    }
}

#[async_trait]
impl UserPersistence for EmbeddedPersistService {
    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>> {
        let json = self.get_json(CF_USERS, email)?;
        Ok(json.as_ref().map(Self::json_to_user))
    }

    async fn user_create(
        &self,
        email: &str,
        password_hash: &str,
        enabled: bool,
    ) -> anyhow::Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        let value = serde_json::json!({
            "email": email,
            "password_hash": password_hash,
            "enabled": enabled,
            "created_time": now,
        });

        self.put_json(CF_USERS, email, &value)
    }

    async fn user_count(&self) -> anyhow::Result<u64> {
        let cf = self.cf(CF_USERS)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| store_error("iterator", e))?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl PersistenceService for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Embedded
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        // Verify we can access column families
        self.cf(CF_STUDENTS)?;
        self.cf(CF_DECLARATIONS)?;
        self.cf(CF_USERS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (EmbeddedPersistService, TempDir) {
        let tmp_dir = TempDir::new().unwrap();
        let service = EmbeddedPersistService::open(tmp_dir.path()).unwrap();
        (service, tmp_dir)
    }

    fn new_student(name: &str, national_id: &str, birth_date: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            national_id: national_id.to_string(),
            birth_date: birth_date.to_string(),
            enrollment_code: "2025001".to_string(),
            class_label: "Turma A".to_string(),
            phase: "Maternal II".to_string(),
            shift: "Matutino".to_string(),
            status: StudentStatus::Active,
        }
    }

    fn upsert(student: &StudentInfo, month: ReferenceMonth, year: i32, presence: u32) -> DeclarationUpsert {
        DeclarationUpsert {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            reference_month: month,
            reference_year: year,
            school_days: 20,
            presence,
            percentage: presence as f64 * 100.0 / 20.0,
        }
    }

    // ==================== Student Tests ====================

    #[tokio::test]
    async fn test_student_create_and_find() {
        let (svc, _tmp) = create_test_service();

        let created = svc
            .student_create(&new_student("ANA CLARA", "123.456.789-09", "2021-03-15"))
            .await
            .unwrap();
        assert!(!created.id.is_empty());
        assert!(created.created_time > 0);

        let found = svc.student_find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);

        assert!(svc.student_find_by_id("missing").await.unwrap().is_none());
        assert_eq!(svc.student_find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_student_find_by_identity_requires_both_fields() {
        let (svc, _tmp) = create_test_service();

        let created = svc
            .student_create(&new_student("ANA", "11122233344", "2021-03-15"))
            .await
            .unwrap();

        let found = svc
            .student_find_by_identity("11122233344", "2021-03-15")
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(created.id));

        assert!(
            svc.student_find_by_identity("11122233344", "2021-03-16")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            svc.student_find_by_identity("99999999999", "2021-03-15")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_student_update_and_delete() {
        let (svc, _tmp) = create_test_service();

        let created = svc
            .student_create(&new_student("BRUNO", "1", "2020-01-01"))
            .await
            .unwrap();

        let patch = StudentPatch {
            class_label: Some("Turma B".to_string()),
            ..Default::default()
        };
        let updated = svc
            .student_update(&created.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.class_label, "Turma B");
        assert_eq!(updated.name, "BRUNO");
        assert_eq!(updated.created_time, created.created_time);

        assert!(svc.student_update("missing", &patch).await.unwrap().is_none());

        assert!(svc.student_delete(&created.id).await.unwrap());
        assert!(!svc.student_delete(&created.id).await.unwrap());
        assert!(svc.student_find_all().await.unwrap().is_empty());
    }

    // ==================== Declaration Tests ====================

    #[tokio::test]
    async fn test_declaration_upsert_keeps_one_per_month() {
        let (svc, _tmp) = create_test_service();
        let student = svc
            .student_create(&new_student("CAIO", "2", "2020-02-02"))
            .await
            .unwrap();

        let first = svc
            .declaration_upsert(&upsert(&student, ReferenceMonth::March, 2025, 18))
            .await
            .unwrap();
        let second = svc
            .declaration_upsert(&upsert(&student, ReferenceMonth::March, 2025, 15))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.issued_at >= first.issued_at);

        let all = svc.declaration_find_by_student(&student.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].presence, 15);
        assert_eq!(all[0].percentage, 75.0);
    }

    #[tokio::test]
    async fn test_declaration_queries() {
        let (svc, _tmp) = create_test_service();
        let a = svc
            .student_create(&new_student("DAVI", "3", "2020-03-03"))
            .await
            .unwrap();
        let b = svc
            .student_create(&new_student("ELIS", "4", "2020-04-04"))
            .await
            .unwrap();

        svc.declaration_upsert(&upsert(&a, ReferenceMonth::March, 2025, 20))
            .await
            .unwrap();
        svc.declaration_upsert(&upsert(&a, ReferenceMonth::April, 2025, 19))
            .await
            .unwrap();
        svc.declaration_upsert(&upsert(&b, ReferenceMonth::March, 2025, 10))
            .await
            .unwrap();

        let march = svc
            .declaration_find_by_month(ReferenceMonth::March, 2025)
            .await
            .unwrap();
        assert_eq!(march.len(), 2);

        let a_history = svc.declaration_find_by_student(&a.id).await.unwrap();
        assert_eq!(a_history.len(), 2);
        assert!(a_history.iter().all(|d| d.student_id == a.id));

        let one = svc
            .declaration_find_one(&b.id, ReferenceMonth::March, 2025)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one.presence, 10);
        assert_eq!(one.reference_month, ReferenceMonth::March);
        assert!(
            svc.declaration_find_one(&b.id, ReferenceMonth::April, 2025)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_student_delete_keeps_declarations() {
        let (svc, _tmp) = create_test_service();
        let student = svc
            .student_create(&new_student("FABI", "5", "2020-05-05"))
            .await
            .unwrap();
        svc.declaration_upsert(&upsert(&student, ReferenceMonth::May, 2025, 20))
            .await
            .unwrap();

        svc.student_delete(&student.id).await.unwrap();

        let history = svc.declaration_find_by_student(&student.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    // ==================== User Tests ====================

    #[tokio::test]
    async fn test_user_create_and_count() {
        let (svc, _tmp) = create_test_service();
        assert_eq!(svc.user_count().await.unwrap(), 0);

        svc.user_create("secretaria@cmei.edu.br", "$2b$hash", true)
            .await
            .unwrap();

        let user = svc
            .user_find_by_email("secretaria@cmei.edu.br")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.password, "$2b$hash");
        assert!(user.enabled);
        assert_eq!(svc.user_count().await.unwrap(), 1);
        assert!(svc.user_find_by_email("other@cmei.edu.br").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_health_check_and_mode() {
        let (svc, _tmp) = create_test_service();
        assert!(svc.health_check().await.is_ok());
        assert_eq!(svc.storage_mode(), StorageMode::Embedded);
    }

    #[test]
    fn test_store_error_is_database_error() {
        let err: anyhow::Error = store_error("put", "IO error: No space left on device").into();
        match err.downcast_ref::<PiagetError>() {
            Some(PiagetError::DatabaseError(message)) => {
                assert_eq!(message, "RocksDB put error: IO error: No space left on device")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_declaration_key_sorts_by_year_then_month() {
        let k1 = EmbeddedPersistService::declaration_key("s", ReferenceMonth::December, 2024);
        let k2 = EmbeddedPersistService::declaration_key("s", ReferenceMonth::February, 2025);
        let k3 = EmbeddedPersistService::declaration_key("s", ReferenceMonth::November, 2025);
        assert!(k1 < k2);
        assert!(k2 < k3);
        assert_eq!(k2, "s@@2025@@02");
    }
}
