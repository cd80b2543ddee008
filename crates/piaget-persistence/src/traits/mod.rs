//! Persistence traits for the unified storage abstraction layer
//!
//! This module defines the core persistence traits that abstract over the
//! storage backends: external database (MySQL/PostgreSQL) and embedded
//! (RocksDB).

pub mod declaration;
pub mod student;
pub mod user;

pub use declaration::DeclarationPersistence;
pub use student::StudentPersistence;
pub use user::UserPersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified persistence service trait
///
/// This is the main interface for all storage operations. Implementations
/// dispatch to the appropriate storage backend based on the configured mode.
#[async_trait]
pub trait PersistenceService:
    StudentPersistence + DeclarationPersistence + UserPersistence + Send + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
