use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_current_active_non_free_subscription(
        &self,
        user_id: Uuid,
        free_plan_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>>;

    async fn update_status_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<()>;

    /// Moves the local period window to the one Stripe reports after a renewal.
    async fn update_period_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> Result<()>;

    async fn create_or_update_subscription_after_checkout(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        status: SubscriptionStatus,
        provider_subscription_id: String,
    ) -> Result<Uuid>;

    async fn cancel_recurring_subscription(&self, user_id: Uuid) -> Result<()>;

    async fn list_subscriptions(&self, limit: i64, offset: i64)
    -> Result<Vec<SubscriptionEntity>>;

    /// Active, unexpired subscriptions grouped by plan code.
    async fn count_active_by_plan_code(&self) -> Result<Vec<(String, i64)>>;
}
