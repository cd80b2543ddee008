//! `SeaORM` Entity for declarations table
//!
//! Declarations are not removed together with their student. At most one row
//! exists per student, reference month and year (unique key created by
//! `ExternalDbPersistService::ensure_schema`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "declarations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub reference_month: i32,
    pub reference_year: i32,
    pub school_days: i32,
    pub presence: i32,
    #[sea_orm(column_type = "Double")]
    pub percentage: f64,
    pub gmt_create: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
