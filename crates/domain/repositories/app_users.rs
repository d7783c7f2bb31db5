use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::app_users::AppUserEntity;

#[automock]
#[async_trait]
pub trait AppUserRepository {
    /// Inserts the user on first sight; refreshes the email otherwise.
    async fn upsert(&self, user_id: Uuid, email: Option<String>) -> Result<()>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AppUserEntity>>;

    async fn count(&self) -> Result<i64>;
}
