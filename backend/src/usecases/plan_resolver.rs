use anyhow::Result;
use crates::domain::{
    entities::plans::PlanEntity,
    repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Resolves the effective plan for a user: active paid subscription or free plan fallback.
pub struct PlanResolver<P, S>
where
    P: PlanRepository + Send + Sync + ?Sized + 'static,
    S: SubscriptionRepository + Send + Sync + ?Sized + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    free_plan_id: Uuid,
}

impl<P, S> PlanResolver<P, S>
where
    P: PlanRepository + Send + Sync + ?Sized + 'static,
    S: SubscriptionRepository + Send + Sync + ?Sized + 'static,
{
    pub fn new(plan_repo: Arc<P>, subscription_repo: Arc<S>, free_plan_id: Uuid) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            free_plan_id,
        }
    }

    pub async fn resolve_effective_plan_for_user(&self, user_id: Uuid) -> Result<PlanEntity> {
        if let Some(subscription) = self
            .subscription_repo
            .find_current_active_non_free_subscription(user_id, self.free_plan_id)
            .await?
        {
            debug!(
                %user_id,
                plan_id = %subscription.plan_id,
                "plan_resolver: using active subscription plan"
            );
            if let Some(plan) = self.plan_repo.find_by_id(subscription.plan_id).await? {
                return Ok(plan);
            }
            warn!(
                %user_id,
                plan_id = %subscription.plan_id,
                "plan_resolver: subscribed plan is missing, using free plan"
            );
        }

        debug!(%user_id, "plan_resolver: falling back to free plan");
        let free_plan = self
            .plan_repo
            .find_by_id(self.free_plan_id)
            .await?
            .unwrap_or_else(PlanEntity::free_tier);

        Ok(free_plan)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crates::domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{plans::MockPlanRepository, subscriptions::MockSubscriptionRepository},
        value_objects::{
            enums::{plan_codes::PlanCode, subscription_statuses::SubscriptionStatus},
            plans::{FREE_PLAN_ID, PlanFeatures},
        },
    };
    use mockall::predicate::eq;

    pub(crate) fn sample_plan(id: Uuid, features: PlanFeatures) -> PlanEntity {
        PlanEntity {
            id,
            code: PlanCode::Family,
            name: Some("Family".to_string()),
            price_minor: 1980,
            duration_days: 30,
            features,
            is_active: true,
            stripe_price_recurring: Some("price_family".to_string()),
        }
    }

    pub(crate) fn sample_subscription(user_id: Uuid, plan_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(29),
            status: SubscriptionStatus::Active.to_string(),
            cancel_at_period_end: false,
            canceled_at: None,
            provider_subscription_id: Some("sub_123".to_string()),
            created_at: now,
        }
    }

    /// Plan repository and subscription repository mocks that resolve `user_id`
    /// to a plan with `features`.
    pub(crate) fn resolver_mocks(
        user_id: Uuid,
        features: PlanFeatures,
    ) -> (MockPlanRepository, MockSubscriptionRepository) {
        let plan_id = Uuid::new_v4();
        let plan = sample_plan(plan_id, features);
        let subscription = sample_subscription(user_id, plan_id);

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_find_current_active_non_free_subscription()
            .with(eq(user_id), eq(FREE_PLAN_ID))
            .returning(move |_, _| Ok(Some(subscription.clone())));
        plan_repo
            .expect_find_by_id()
            .with(eq(plan_id))
            .returning(move |_| Ok(Some(plan.clone())));

        (plan_repo, subscription_repo)
    }

    #[tokio::test]
    async fn returns_paid_plan_when_subscription_exists() {
        let user_id = Uuid::new_v4();
        let features = PlanFeatures {
            max_households: Some(5),
            ..PlanFeatures::default()
        };
        let (plan_repo, subscription_repo) = resolver_mocks(user_id, features);

        let resolver = PlanResolver::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            FREE_PLAN_ID,
        );

        let plan = resolver
            .resolve_effective_plan_for_user(user_id)
            .await
            .unwrap();

        assert_eq!(plan.features.max_households_or_default(), 5);
    }

    #[tokio::test]
    async fn falls_back_to_free_plan_when_no_active_subscription() {
        let user_id = Uuid::new_v4();

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();

        let free_plan = sample_plan(FREE_PLAN_ID, PlanFeatures::free_tier());

        subscription_repo
            .expect_find_current_active_non_free_subscription()
            .with(eq(user_id), eq(FREE_PLAN_ID))
            .returning(|_, _| Ok(None));

        plan_repo
            .expect_find_by_id()
            .with(eq(FREE_PLAN_ID))
            .returning(move |_| Ok(Some(free_plan.clone())));

        let resolver = PlanResolver::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            FREE_PLAN_ID,
        );

        let plan = resolver
            .resolve_effective_plan_for_user(user_id)
            .await
            .unwrap();

        assert_eq!(plan.id, FREE_PLAN_ID);
    }

    #[tokio::test]
    async fn uses_built_in_free_tier_when_free_row_is_missing() {
        let user_id = Uuid::new_v4();

        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_find_current_active_non_free_subscription()
            .returning(|_, _| Ok(None));
        plan_repo.expect_find_by_id().returning(|_| Ok(None));

        let resolver = PlanResolver::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            FREE_PLAN_ID,
        );

        let plan = resolver
            .resolve_effective_plan_for_user(user_id)
            .await
            .unwrap();

        assert_eq!(plan, PlanEntity::free_tier());
        assert_eq!(plan.features.max_households_or_default(), 1);
    }
}
