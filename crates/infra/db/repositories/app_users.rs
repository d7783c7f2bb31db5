use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{dsl::count_star, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::app_users},
};
use domain::{
    entities::app_users::{AppUserEntity, InsertAppUserEntity},
    repositories::app_users::AppUserRepository,
    value_objects::enums::user_roles::UserRole,
};

pub struct AppUserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AppUserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AppUserRepository for AppUserPostgres {
    async fn upsert(&self, user_id: Uuid, email: Option<String>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let insert_app_user_entity = InsertAppUserEntity {
            id: user_id,
            email: email.clone(),
            role: UserRole::User.to_string(),
            created_at: Utc::now(),
        };

        match email {
            Some(email) => {
                insert_into(app_users::table)
                    .values(&insert_app_user_entity)
                    .on_conflict(app_users::id)
                    .do_update()
                    .set(app_users::email.eq(email))
                    .execute(&mut conn)?;
            }
            None => {
                insert_into(app_users::table)
                    .values(&insert_app_user_entity)
                    .on_conflict(app_users::id)
                    .do_nothing()
                    .execute(&mut conn)?;
            }
        }

        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AppUserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = app_users::table
            .order(app_users::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(AppUserEntity::as_select())
            .load::<AppUserEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = app_users::table
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }
}
