use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{delete, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{contacts, households},
    },
};
use domain::{
    entities::households::{HouseholdChangeset, HouseholdEntity, InsertHouseholdEntity},
    repositories::households::HouseholdRepository,
};

pub struct HouseholdPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl HouseholdPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl HouseholdRepository for HouseholdPostgres {
    async fn create(&self, insert_household_entity: InsertHouseholdEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(households::table)
            .values(&insert_household_entity)
            .returning(households::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, household_id: Uuid) -> Result<Option<HouseholdEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let household = households::table
            .find(household_id)
            .select(HouseholdEntity::as_select())
            .first::<HouseholdEntity>(&mut conn)
            .optional()?;

        Ok(household)
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<HouseholdEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = households::table
            .filter(households::user_id.eq(user_id))
            .order(households::created_at.asc())
            .select(HouseholdEntity::as_select())
            .load::<HouseholdEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_by_address_grid(&self, address_grid: &str) -> Result<Vec<HouseholdEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = households::table
            .filter(households::address_grid.eq(address_grid))
            .select(HouseholdEntity::as_select())
            .load::<HouseholdEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_by_owner(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = households::table
            .filter(households::user_id.eq(user_id))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn count_all(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = households::table
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn update(
        &self,
        household_id: Uuid,
        changes: HouseholdChangeset,
    ) -> Result<HouseholdEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let changes = HouseholdChangeset {
            updated_at: Some(Utc::now()),
            ..changes
        };

        let household = update(households::table.find(household_id))
            .set(&changes)
            .returning(HouseholdEntity::as_returning())
            .get_result::<HouseholdEntity>(&mut conn)?;

        Ok(household)
    }

    async fn delete(&self, household_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            delete(contacts::table.filter(contacts::household_id.eq(household_id)))
                .execute(conn)?;
            delete(households::table.find(household_id)).execute(conn)?;
            Ok(())
        })?;

        Ok(())
    }
}
