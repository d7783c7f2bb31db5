use anyhow::Result;
use async_trait::async_trait;
use diesel::{delete, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::contacts},
};
use domain::{
    entities::contacts::{ContactChangeset, ContactEntity, InsertContactEntity},
    repositories::contacts::ContactRepository,
};

pub struct ContactPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ContactPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ContactRepository for ContactPostgres {
    async fn create(&self, insert_contact_entity: InsertContactEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(contacts::table)
            .values(&insert_contact_entity)
            .returning(contacts::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, contact_id: Uuid) -> Result<Option<ContactEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let contact = contacts::table
            .find(contact_id)
            .select(ContactEntity::as_select())
            .first::<ContactEntity>(&mut conn)
            .optional()?;

        Ok(contact)
    }

    async fn list_by_household(&self, household_id: Uuid) -> Result<Vec<ContactEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = contacts::table
            .filter(contacts::household_id.eq(household_id))
            .order((contacts::priority.asc(), contacts::created_at.asc()))
            .select(ContactEntity::as_select())
            .load::<ContactEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_by_household(&self, household_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = contacts::table
            .filter(contacts::household_id.eq(household_id))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn update(&self, contact_id: Uuid, changes: ContactChangeset) -> Result<ContactEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let contact = update(contacts::table.find(contact_id))
            .set(&changes)
            .returning(ContactEntity::as_returning())
            .get_result::<ContactEntity>(&mut conn)?;

        Ok(contact)
    }

    async fn delete(&self, contact_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(contacts::table.find(contact_id)).execute(&mut conn)?;

        Ok(())
    }
}
