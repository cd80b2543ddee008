//! `SeaORM` Entity prelude

pub use super::declarations::Entity as Declarations;
pub use super::students::Entity as Students;
pub use super::users::Entity as Users;
