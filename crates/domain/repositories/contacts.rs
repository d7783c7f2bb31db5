use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::contacts::{ContactChangeset, ContactEntity, InsertContactEntity};

#[automock]
#[async_trait]
pub trait ContactRepository {
    async fn create(&self, insert_contact_entity: InsertContactEntity) -> Result<Uuid>;

    async fn find_by_id(&self, contact_id: Uuid) -> Result<Option<ContactEntity>>;

    /// Ordered by priority, lowest number first.
    async fn list_by_household(&self, household_id: Uuid) -> Result<Vec<ContactEntity>>;

    async fn count_by_household(&self, household_id: Uuid) -> Result<i64>;

    async fn update(&self, contact_id: Uuid, changes: ContactChangeset) -> Result<ContactEntity>;

    async fn delete(&self, contact_id: Uuid) -> Result<()>;
}
