//! Domain model types for the persistence abstraction layer
//!
//! These types are used as arguments and return values of the persistence
//! traits, decoupled from specific storage backends.

use serde::{Deserialize, Serialize};

use piaget_common::{ReferenceMonth, StudentStatus};

/// Student record as stored
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub national_id: String,
    pub birth_date: String,
    pub enrollment_code: String,
    pub class_label: String,
    pub phase: String,
    pub shift: String,
    pub status: StudentStatus,
    pub created_time: i64,
    pub modified_time: i64,
}

/// Fields of a student about to be created; the store assigns the id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub enrollment_code: String,
    #[serde(default)]
    pub class_label: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub status: StudentStatus,
}

/// Partial update of a student; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub enrollment_code: Option<String>,
    pub class_label: Option<String>,
    pub phase: Option<String>,
    pub shift: Option<String>,
    pub status: Option<StudentStatus>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.national_id.is_none()
            && self.birth_date.is_none()
            && self.enrollment_code.is_none()
            && self.class_label.is_none()
            && self.phase.is_none()
            && self.shift.is_none()
            && self.status.is_none()
    }

    /// Applies the present fields onto `student`.
    pub fn apply(&self, student: &mut StudentInfo) {
        if let Some(v) = &self.name {
            student.name = v.clone();
        }
        if let Some(v) = &self.national_id {
            student.national_id = v.clone();
        }
        if let Some(v) = &self.birth_date {
            student.birth_date = v.clone();
        }
        if let Some(v) = &self.enrollment_code {
            student.enrollment_code = v.clone();
        }
        if let Some(v) = &self.class_label {
            student.class_label = v.clone();
        }
        if let Some(v) = &self.phase {
            student.phase = v.clone();
        }
        if let Some(v) = &self.shift {
            student.shift = v.clone();
        }
        if let Some(v) = self.status {
            student.status = v;
        }
    }
}

/// Monthly attendance declaration as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationInfo {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub reference_month: ReferenceMonth,
    pub reference_year: i32,
    pub school_days: u32,
    pub presence: u32,
    pub percentage: f64,
    pub issued_at: i64,
}

/// Values written by an attendance save, keyed by (student, month, year).
#[derive(Clone, Debug, PartialEq)]
pub struct DeclarationUpsert {
    pub student_id: String,
    pub student_name: String,
    pub reference_month: ReferenceMonth,
    pub reference_year: i32,
    pub school_days: u32,
    pub presence: u32,
    pub percentage: f64,
}

/// Staff account information returned from persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub password: String,
    pub enabled: bool,
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    ExternalDb,
    /// Embedded RocksDB (single node, no external DB)
    Embedded,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Embedded => write!(f, "embedded"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "embedded" => Ok(StorageMode::Embedded),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}
