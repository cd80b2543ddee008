//! Staff account persistence trait

use async_trait::async_trait;

use crate::model::UserInfo;

/// Staff account storage operations
#[async_trait]
pub trait UserPersistence: Send + Sync {
    /// Find a user by e-mail
    async fn user_find_by_email(&self, email: &str) -> anyhow::Result<Option<UserInfo>>;

    /// Create a new user with an already hashed password
    async fn user_create(
        &self,
        email: &str,
        password_hash: &str,
        enabled: bool,
    ) -> anyhow::Result<()>;

    /// Number of registered users
    async fn user_count(&self) -> anyhow::Result<u64>;
}
