use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::households::{HouseholdChangeset, HouseholdEntity, InsertHouseholdEntity},
    repositories::{
        app_users::AppUserRepository, households::HouseholdRepository, plans::PlanRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        households::{
            CreateHouseholdModel, HouseholdDto, UpdateHouseholdModel, is_valid_address_grid,
            is_valid_phone,
        },
        plans::FREE_PLAN_ID,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::plan_resolver::PlanResolver;

#[derive(Debug, Error)]
pub enum HouseholdError {
    #[error("household not found")]
    HouseholdNotFound,
    #[error("contact not found")]
    ContactNotFound,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("household limit reached")]
    HouseholdLimitReached,
    #[error("contact limit reached")]
    ContactLimitReached,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HouseholdError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            HouseholdError::HouseholdNotFound | HouseholdError::ContactNotFound => {
                StatusCode::NOT_FOUND
            }
            HouseholdError::Validation(_) => StatusCode::BAD_REQUEST,
            HouseholdError::HouseholdLimitReached | HouseholdError::ContactLimitReached => {
                StatusCode::CONFLICT
            }
            HouseholdError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, HouseholdError>;

/// Empty strings clear optional text fields on update.
pub(crate) fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn validate_phone(phone: &str) -> UseCaseResult<()> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(HouseholdError::Validation(
            "phone must be in E.164 format, e.g. +819012345678".to_string(),
        ))
    }
}

fn validate_name(name: &str) -> UseCaseResult<()> {
    if name.trim().is_empty() {
        return Err(HouseholdError::Validation("name is required".to_string()));
    }
    Ok(())
}

fn validate_address_grid(address_grid: &str) -> UseCaseResult<()> {
    if is_valid_address_grid(address_grid) {
        Ok(())
    } else {
        Err(HouseholdError::Validation(
            "address_grid must be a 6 to 10 digit mesh code".to_string(),
        ))
    }
}

pub struct HouseholdUseCase<H, U, P, S>
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    household_repo: Arc<H>,
    app_user_repo: Arc<U>,
    plan_resolver: PlanResolver<P, S>,
}

impl<H, U, P, S> HouseholdUseCase<H, U, P, S>
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        household_repo: Arc<H>,
        app_user_repo: Arc<U>,
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
    ) -> Self {
        Self {
            household_repo,
            app_user_repo,
            plan_resolver: PlanResolver::new(plan_repo, subscription_repo, FREE_PLAN_ID),
        }
    }

    pub async fn create_household(
        &self,
        user_id: Uuid,
        email: Option<String>,
        model: CreateHouseholdModel,
    ) -> UseCaseResult<HouseholdDto> {
        validate_name(&model.name)?;
        validate_phone(&model.phone)?;
        validate_address_grid(&model.address_grid)?;

        self.app_user_repo
            .upsert(user_id, email)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "households: failed to ensure app user");
                HouseholdError::Internal(err)
            })?;

        let plan = self
            .plan_resolver
            .resolve_effective_plan_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "households: failed to resolve plan");
                HouseholdError::Internal(err)
            })?;

        let household_count = self
            .household_repo
            .count_by_owner(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "households: failed to count households");
                HouseholdError::Internal(err)
            })?;

        let max_households = plan.features.max_households_or_default();
        if household_count >= max_households {
            warn!(
                %user_id,
                household_count,
                max_households,
                plan_code = %plan.code,
                "households: household limit reached"
            );
            return Err(HouseholdError::HouseholdLimitReached);
        }

        let now = Utc::now();
        let insert_household_entity = InsertHouseholdEntity {
            user_id,
            name: model.name.trim().to_string(),
            phone: model.phone,
            address_grid: model.address_grid,
            risk_flag: model.risk_flag,
            notes: model.notes.and_then(blank_to_none),
            line_user_id: model.line_user_id.and_then(blank_to_none),
            preferred_channel: model.preferred_channel.to_string(),
            created_at: now,
            updated_at: now,
        };

        let household_id = self
            .household_repo
            .create(insert_household_entity.clone())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "households: failed to create household");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, "households: household created");

        Ok(HouseholdDto::from(HouseholdEntity {
            id: household_id,
            user_id: insert_household_entity.user_id,
            name: insert_household_entity.name,
            phone: insert_household_entity.phone,
            address_grid: insert_household_entity.address_grid,
            risk_flag: insert_household_entity.risk_flag,
            notes: insert_household_entity.notes,
            line_user_id: insert_household_entity.line_user_id,
            preferred_channel: insert_household_entity.preferred_channel,
            created_at: insert_household_entity.created_at,
            updated_at: insert_household_entity.updated_at,
        }))
    }

    pub async fn list_households(&self, user_id: Uuid) -> UseCaseResult<Vec<HouseholdDto>> {
        let households = self
            .household_repo
            .list_by_owner(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "households: failed to list households");
                HouseholdError::Internal(err)
            })?;

        Ok(households.into_iter().map(HouseholdDto::from).collect())
    }

    pub async fn get_household(
        &self,
        user_id: Uuid,
        household_id: Uuid,
    ) -> UseCaseResult<HouseholdDto> {
        let household = self.find_owned(user_id, household_id).await?;
        Ok(HouseholdDto::from(household))
    }

    pub async fn update_household(
        &self,
        user_id: Uuid,
        household_id: Uuid,
        model: UpdateHouseholdModel,
    ) -> UseCaseResult<HouseholdDto> {
        if let Some(name) = model.name.as_deref() {
            validate_name(name)?;
        }
        if let Some(phone) = model.phone.as_deref() {
            validate_phone(phone)?;
        }
        if let Some(address_grid) = model.address_grid.as_deref() {
            validate_address_grid(address_grid)?;
        }

        self.find_owned(user_id, household_id).await?;

        let changes = HouseholdChangeset {
            name: model.name.map(|name| name.trim().to_string()),
            phone: model.phone,
            address_grid: model.address_grid,
            risk_flag: model.risk_flag,
            notes: model.notes.map(blank_to_none),
            line_user_id: model.line_user_id.map(blank_to_none),
            preferred_channel: model.preferred_channel.map(|channel| channel.to_string()),
            updated_at: Some(Utc::now()),
        };

        let household = self
            .household_repo
            .update(household_id, changes)
            .await
            .map_err(|err| {
                error!(%user_id, %household_id, db_error = ?err, "households: failed to update household");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, "households: household updated");
        Ok(HouseholdDto::from(household))
    }

    pub async fn delete_household(&self, user_id: Uuid, household_id: Uuid) -> UseCaseResult<()> {
        self.find_owned(user_id, household_id).await?;

        self.household_repo
            .delete(household_id)
            .await
            .map_err(|err| {
                error!(%user_id, %household_id, db_error = ?err, "households: failed to delete household");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, "households: household deleted");
        Ok(())
    }

    async fn find_owned(&self, user_id: Uuid, household_id: Uuid) -> UseCaseResult<HouseholdEntity> {
        let household = self
            .household_repo
            .find_by_id(household_id)
            .await
            .map_err(|err| {
                error!(%user_id, %household_id, db_error = ?err, "households: failed to load household");
                HouseholdError::Internal(err)
            })?;

        match household {
            Some(household) if household.user_id == user_id => Ok(household),
            _ => {
                warn!(%user_id, %household_id, "households: household not found for owner");
                Err(HouseholdError::HouseholdNotFound)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::usecases::plan_resolver::tests::resolver_mocks;
    use crates::domain::{
        repositories::{app_users::MockAppUserRepository, households::MockHouseholdRepository},
        value_objects::{enums::notify_channels::NotifyChannel, plans::PlanFeatures},
    };
    use mockall::predicate::eq;

    pub(crate) fn sample_household(user_id: Uuid) -> HouseholdEntity {
        let now = Utc::now();
        HouseholdEntity {
            id: Uuid::new_v4(),
            user_id,
            name: "田中 ハナ".to_string(),
            phone: "+819012345678".to_string(),
            address_grid: "53394611".to_string(),
            risk_flag: false,
            notes: None,
            line_user_id: None,
            preferred_channel: "voice".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn create_model() -> CreateHouseholdModel {
        CreateHouseholdModel {
            name: " 田中 ハナ ".to_string(),
            phone: "+819012345678".to_string(),
            address_grid: "53394611".to_string(),
            risk_flag: true,
            notes: Some("".to_string()),
            line_user_id: None,
            preferred_channel: NotifyChannel::Voice,
        }
    }

    fn usecase(
        household_repo: MockHouseholdRepository,
        user_id: Uuid,
        max_households: i64,
    ) -> HouseholdUseCase<
        MockHouseholdRepository,
        MockAppUserRepository,
        crates::domain::repositories::plans::MockPlanRepository,
        crates::domain::repositories::subscriptions::MockSubscriptionRepository,
    > {
        let mut app_user_repo = MockAppUserRepository::new();
        app_user_repo.expect_upsert().returning(|_, _| Ok(()));

        let (plan_repo, subscription_repo) = resolver_mocks(
            user_id,
            PlanFeatures {
                max_households: Some(max_households),
                ..PlanFeatures::default()
            },
        );

        HouseholdUseCase::new(
            Arc::new(household_repo),
            Arc::new(app_user_repo),
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
        )
    }

    #[tokio::test]
    async fn creates_household_under_plan_limit() {
        let user_id = Uuid::new_v4();
        let household_id = Uuid::new_v4();

        let mut household_repo = MockHouseholdRepository::new();
        household_repo
            .expect_count_by_owner()
            .with(eq(user_id))
            .returning(|_| Ok(2));
        household_repo
            .expect_create()
            .withf(|entity| entity.name == "田中 ハナ" && entity.notes.is_none())
            .returning(move |_| Ok(household_id));

        let dto = usecase(household_repo, user_id, 3)
            .create_household(user_id, None, create_model())
            .await
            .unwrap();

        assert_eq!(dto.id, household_id);
        assert!(dto.risk_flag);
    }

    #[tokio::test]
    async fn refuses_household_over_plan_limit() {
        let user_id = Uuid::new_v4();

        let mut household_repo = MockHouseholdRepository::new();
        household_repo.expect_count_by_owner().returning(|_| Ok(1));
        household_repo.expect_create().never();

        let err = usecase(household_repo, user_id, 1)
            .create_household(user_id, None, create_model())
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::HouseholdLimitReached));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rejects_invalid_phone_before_touching_storage() {
        let user_id = Uuid::new_v4();
        let household_repo = MockHouseholdRepository::new();

        let err = HouseholdUseCase::new(
            Arc::new(household_repo),
            Arc::new(MockAppUserRepository::new()),
            Arc::new(crates::domain::repositories::plans::MockPlanRepository::new()),
            Arc::new(crates::domain::repositories::subscriptions::MockSubscriptionRepository::new()),
        )
        .create_household(
            user_id,
            None,
            CreateHouseholdModel {
                phone: "090-1234-5678".to_string(),
                ..create_model()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, HouseholdError::Validation(_)));
    }

    #[tokio::test]
    async fn other_owners_household_is_not_found() {
        let owner_id = Uuid::new_v4();
        let stranger_id = Uuid::new_v4();
        let household = sample_household(owner_id);
        let household_id = household.id;

        let mut household_repo = MockHouseholdRepository::new();
        household_repo
            .expect_find_by_id()
            .with(eq(household_id))
            .returning(move |_| Ok(Some(household.clone())));
        household_repo.expect_delete().never();

        let err = usecase(household_repo, stranger_id, 1)
            .delete_household(stranger_id, household_id)
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::HouseholdNotFound));
    }

    #[tokio::test]
    async fn update_clears_notes_with_empty_string() {
        let user_id = Uuid::new_v4();
        let household = sample_household(user_id);
        let household_id = household.id;
        let updated = HouseholdEntity {
            notes: None,
            ..household.clone()
        };

        let mut household_repo = MockHouseholdRepository::new();
        household_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(household.clone())));
        household_repo
            .expect_update()
            .withf(|_, changes| changes.notes == Some(None) && changes.name.is_none())
            .returning(move |_, _| Ok(updated.clone()));

        let dto = usecase(household_repo, user_id, 1)
            .update_household(
                user_id,
                household_id,
                UpdateHouseholdModel {
                    notes: Some(" ".to_string()),
                    ..UpdateHouseholdModel::default()
                },
            )
            .await
            .unwrap();

        assert!(dto.notes.is_none());
    }
}
