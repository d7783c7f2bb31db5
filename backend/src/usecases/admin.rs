use std::{collections::BTreeMap, sync::Arc};

use chrono::{Duration, Utc};
use crates::domain::{
    repositories::{
        alerts::AlertRepository, app_users::AppUserRepository, households::HouseholdRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        admin::{AdminStatsDto, AppUserDto, PageQuery},
        subscriptions::SubscriptionDto,
    },
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin role required")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdminError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AdminError::Forbidden => StatusCode::FORBIDDEN,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AdminError>;

fn page(query: &PageQuery) -> (i64, i64) {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub struct AdminUseCase<U, S, H, A>
where
    U: AppUserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
    A: AlertRepository + Send + Sync + 'static,
{
    app_user_repo: Arc<U>,
    subscription_repo: Arc<S>,
    household_repo: Arc<H>,
    alert_repo: Arc<A>,
}

impl<U, S, H, A> AdminUseCase<U, S, H, A>
where
    U: AppUserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
    A: AlertRepository + Send + Sync + 'static,
{
    pub fn new(
        app_user_repo: Arc<U>,
        subscription_repo: Arc<S>,
        household_repo: Arc<H>,
        alert_repo: Arc<A>,
    ) -> Self {
        Self {
            app_user_repo,
            subscription_repo,
            household_repo,
            alert_repo,
        }
    }

    pub async fn list_users(
        &self,
        user_id: Uuid,
        is_admin: bool,
        query: PageQuery,
    ) -> UseCaseResult<Vec<AppUserDto>> {
        ensure_admin(user_id, is_admin)?;
        let (limit, offset) = page(&query);

        let users = self
            .app_user_repo
            .list(limit, offset)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to list users");
                AdminError::Internal(err)
            })?;

        Ok(users.into_iter().map(AppUserDto::from).collect())
    }

    pub async fn list_subscriptions(
        &self,
        user_id: Uuid,
        is_admin: bool,
        query: PageQuery,
    ) -> UseCaseResult<Vec<SubscriptionDto>> {
        ensure_admin(user_id, is_admin)?;
        let (limit, offset) = page(&query);

        let subscriptions = self
            .subscription_repo
            .list_subscriptions(limit, offset)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to list subscriptions");
                AdminError::Internal(err)
            })?;

        Ok(subscriptions.into_iter().map(SubscriptionDto::from).collect())
    }

    pub async fn stats(&self, user_id: Uuid, is_admin: bool) -> UseCaseResult<AdminStatsDto> {
        ensure_admin(user_id, is_admin)?;

        let users = self.app_user_repo.count().await.map_err(|err| {
            error!(db_error = ?err, "admin: failed to count users");
            AdminError::Internal(err)
        })?;
        let households = self.household_repo.count_all().await.map_err(|err| {
            error!(db_error = ?err, "admin: failed to count households");
            AdminError::Internal(err)
        })?;
        let alerts_last_24h = self
            .alert_repo
            .count_by_status_since(Utc::now() - Duration::hours(24))
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to count alerts");
                AdminError::Internal(err)
            })?;
        let active_subscriptions = self
            .subscription_repo
            .count_active_by_plan_code()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to count subscriptions");
                AdminError::Internal(err)
            })?;

        Ok(AdminStatsDto {
            users,
            households,
            alerts_last_24h: alerts_last_24h.into_iter().collect::<BTreeMap<_, _>>(),
            active_subscriptions: active_subscriptions.into_iter().collect::<BTreeMap<_, _>>(),
        })
    }
}

fn ensure_admin(user_id: Uuid, is_admin: bool) -> UseCaseResult<()> {
    if is_admin {
        Ok(())
    } else {
        warn!(%user_id, "admin: non-admin access refused");
        Err(AdminError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::{
        alerts::MockAlertRepository, app_users::MockAppUserRepository,
        households::MockHouseholdRepository, subscriptions::MockSubscriptionRepository,
    };
    use mockall::predicate::eq;

    fn use_case(
        app_user_repo: MockAppUserRepository,
        subscription_repo: MockSubscriptionRepository,
        household_repo: MockHouseholdRepository,
        alert_repo: MockAlertRepository,
    ) -> AdminUseCase<
        MockAppUserRepository,
        MockSubscriptionRepository,
        MockHouseholdRepository,
        MockAlertRepository,
    > {
        AdminUseCase::new(
            Arc::new(app_user_repo),
            Arc::new(subscription_repo),
            Arc::new(household_repo),
            Arc::new(alert_repo),
        )
    }

    #[tokio::test]
    async fn stats_collects_counts() {
        let mut app_user_repo = MockAppUserRepository::new();
        app_user_repo.expect_count().returning(|| Ok(12));
        let mut household_repo = MockHouseholdRepository::new();
        household_repo.expect_count_all().returning(|| Ok(30));
        let mut alert_repo = MockAlertRepository::new();
        alert_repo.expect_count_by_status_since().returning(|_| {
            Ok(vec![
                ("unanswered".to_string(), 4),
                ("escalated".to_string(), 1),
            ])
        });
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_count_active_by_plan_code()
            .returning(|| Ok(vec![("family".to_string(), 7)]));

        let stats = use_case(app_user_repo, subscription_repo, household_repo, alert_repo)
            .stats(Uuid::nil(), true)
            .await
            .unwrap();

        assert_eq!(stats.users, 12);
        assert_eq!(stats.households, 30);
        assert_eq!(stats.alerts_last_24h.get("unanswered"), Some(&4));
        assert_eq!(stats.active_subscriptions.get("family"), Some(&7));
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let mut app_user_repo = MockAppUserRepository::new();
        app_user_repo
            .expect_list()
            .with(eq(MAX_PAGE_SIZE), eq(0))
            .returning(|_, _| Ok(Vec::new()));

        let users = use_case(
            app_user_repo,
            MockSubscriptionRepository::new(),
            MockHouseholdRepository::new(),
            MockAlertRepository::new(),
        )
        .list_users(
            Uuid::nil(),
            true,
            PageQuery {
                limit: Some(5_000),
                offset: Some(-3),
            },
        )
        .await
        .unwrap();

        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn non_admins_are_refused() {
        let err = use_case(
            MockAppUserRepository::new(),
            MockSubscriptionRepository::new(),
            MockHouseholdRepository::new(),
            MockAlertRepository::new(),
        )
        .stats(Uuid::new_v4(), false)
        .await
        .unwrap_err();

        assert!(matches!(err, AdminError::Forbidden));
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
