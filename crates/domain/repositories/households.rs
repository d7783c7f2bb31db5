use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::households::{
    HouseholdChangeset, HouseholdEntity, InsertHouseholdEntity,
};

#[automock]
#[async_trait]
pub trait HouseholdRepository {
    async fn create(&self, insert_household_entity: InsertHouseholdEntity) -> Result<Uuid>;

    async fn find_by_id(&self, household_id: Uuid) -> Result<Option<HouseholdEntity>>;

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<HouseholdEntity>>;

    async fn list_by_address_grid(&self, address_grid: &str) -> Result<Vec<HouseholdEntity>>;

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64>;

    async fn count_all(&self) -> Result<i64>;

    async fn update(
        &self,
        household_id: Uuid,
        changes: HouseholdChangeset,
    ) -> Result<HouseholdEntity>;

    /// Deletes the household and its contacts. Alerts are kept for reporting.
    async fn delete(&self, household_id: Uuid) -> Result<()>;
}
