use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plans, subscriptions},
    },
};
use domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_current_active_non_free_subscription(
        &self,
        user_id: Uuid,
        free_plan_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::plan_id.ne(free_plan_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscriptions::ends_at.gt(Utc::now()))
            .order(subscriptions::ends_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }

    async fn update_status_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            subscriptions::table
                .filter(subscriptions::provider_subscription_id.eq(provider_subscription_id)),
        )
        .set(subscriptions::status.eq(status.as_str()))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn update_period_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            subscriptions::table
                .filter(subscriptions::provider_subscription_id.eq(provider_subscription_id)),
        )
        .set((
            subscriptions::starts_at.eq(starts_at),
            subscriptions::ends_at.eq(ends_at),
            subscriptions::status.eq(status.as_str()),
        ))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn create_or_update_subscription_after_checkout(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        status: SubscriptionStatus,
        provider_subscription_id: String,
    ) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription_id = conn.transaction::<Uuid, diesel::result::Error, _>(|conn| {
            let existing = subscriptions::table
                .filter(
                    subscriptions::provider_subscription_id.eq(provider_subscription_id.as_str()),
                )
                .select(subscriptions::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?;

            if let Some(subscription_id) = existing {
                update(subscriptions::table.find(subscription_id))
                    .set((
                        subscriptions::plan_id.eq(plan_id),
                        subscriptions::starts_at.eq(starts_at),
                        subscriptions::ends_at.eq(ends_at),
                        subscriptions::status.eq(status.as_str()),
                    ))
                    .execute(conn)?;
                return Ok(subscription_id);
            }

            insert_into(subscriptions::table)
                .values(&InsertSubscriptionEntity {
                    user_id,
                    plan_id,
                    starts_at,
                    ends_at,
                    status: status.to_string(),
                    cancel_at_period_end: false,
                    canceled_at: None,
                    provider_subscription_id: Some(provider_subscription_id.clone()),
                    created_at: Utc::now(),
                })
                .returning(subscriptions::id)
                .get_result::<Uuid>(conn)
        })?;

        Ok(subscription_id)
    }

    async fn cancel_recurring_subscription(&self, user_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // The plan stays usable until `ends_at`; Stripe sends the deletion event then.
        update(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
                .filter(subscriptions::provider_subscription_id.is_not_null()),
        )
        .set((
            subscriptions::cancel_at_period_end.eq(true),
            subscriptions::canceled_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn list_subscriptions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .order(subscriptions::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn count_active_by_plan_code(&self) -> Result<Vec<(String, i64)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let counts = subscriptions::table
            .inner_join(plans::table)
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .filter(subscriptions::ends_at.gt(Utc::now()))
            .group_by(plans::code)
            .select((plans::code, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        Ok(counts)
    }
}
