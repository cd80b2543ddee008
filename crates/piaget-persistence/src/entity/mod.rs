//! `SeaORM` Entity definitions

pub mod prelude;

pub mod declarations;
pub mod students;
pub mod users;
