use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::contacts::{ContactChangeset, ContactEntity, InsertContactEntity},
    repositories::{
        contacts::ContactRepository, households::HouseholdRepository, plans::PlanRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        contacts::{ContactDto, CreateContactModel, UpdateContactModel},
        plans::FREE_PLAN_ID,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    households::{HouseholdError, UseCaseResult, blank_to_none, validate_phone},
    plan_resolver::PlanResolver,
};

/// Channel flags after a create or update is applied.
fn validate_channels(
    notify_voice: bool,
    notify_sms: bool,
    notify_line: bool,
    line_user_id: Option<&str>,
) -> UseCaseResult<()> {
    if !(notify_voice || notify_sms || notify_line) {
        return Err(HouseholdError::Validation(
            "at least one notification channel must be enabled".to_string(),
        ));
    }
    if notify_line && line_user_id.is_none() {
        return Err(HouseholdError::Validation(
            "notify_line requires line_user_id".to_string(),
        ));
    }
    Ok(())
}

pub struct ContactUseCase<H, C, P, S>
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    household_repo: Arc<H>,
    contact_repo: Arc<C>,
    plan_resolver: PlanResolver<P, S>,
}

impl<H, C, P, S> ContactUseCase<H, C, P, S>
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(
        household_repo: Arc<H>,
        contact_repo: Arc<C>,
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
    ) -> Self {
        Self {
            household_repo,
            contact_repo,
            plan_resolver: PlanResolver::new(plan_repo, subscription_repo, FREE_PLAN_ID),
        }
    }

    pub async fn add_contact(
        &self,
        user_id: Uuid,
        household_id: Uuid,
        model: CreateContactModel,
    ) -> UseCaseResult<ContactDto> {
        if model.name.trim().is_empty() {
            return Err(HouseholdError::Validation("name is required".to_string()));
        }
        validate_phone(&model.phone)?;
        let line_user_id = model.line_user_id.and_then(blank_to_none);
        validate_channels(
            model.notify_voice,
            model.notify_sms,
            model.notify_line,
            line_user_id.as_deref(),
        )?;

        self.ensure_owned_household(user_id, household_id).await?;

        let plan = self
            .plan_resolver
            .resolve_effective_plan_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "contacts: failed to resolve plan");
                HouseholdError::Internal(err)
            })?;

        let contact_count = self
            .contact_repo
            .count_by_household(household_id)
            .await
            .map_err(|err| {
                error!(%household_id, db_error = ?err, "contacts: failed to count contacts");
                HouseholdError::Internal(err)
            })?;

        let max_contacts = plan.features.max_contacts_or_default();
        if contact_count >= max_contacts {
            warn!(
                %user_id,
                %household_id,
                contact_count,
                max_contacts,
                "contacts: contact limit reached"
            );
            return Err(HouseholdError::ContactLimitReached);
        }

        let insert_contact_entity = InsertContactEntity {
            household_id,
            name: model.name.trim().to_string(),
            phone: model.phone,
            line_user_id,
            relationship: model.relationship.and_then(blank_to_none),
            priority: model.priority,
            notify_voice: model.notify_voice,
            notify_sms: model.notify_sms,
            notify_line: model.notify_line,
            created_at: Utc::now(),
        };

        let contact_id = self
            .contact_repo
            .create(insert_contact_entity.clone())
            .await
            .map_err(|err| {
                error!(%household_id, db_error = ?err, "contacts: failed to create contact");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, %contact_id, "contacts: contact added");

        Ok(ContactDto::from(ContactEntity {
            id: contact_id,
            household_id,
            name: insert_contact_entity.name,
            phone: insert_contact_entity.phone,
            line_user_id: insert_contact_entity.line_user_id,
            relationship: insert_contact_entity.relationship,
            priority: insert_contact_entity.priority,
            notify_voice: insert_contact_entity.notify_voice,
            notify_sms: insert_contact_entity.notify_sms,
            notify_line: insert_contact_entity.notify_line,
            created_at: insert_contact_entity.created_at,
        }))
    }

    pub async fn list_contacts(
        &self,
        user_id: Uuid,
        household_id: Uuid,
    ) -> UseCaseResult<Vec<ContactDto>> {
        self.ensure_owned_household(user_id, household_id).await?;

        let contacts = self
            .contact_repo
            .list_by_household(household_id)
            .await
            .map_err(|err| {
                error!(%household_id, db_error = ?err, "contacts: failed to list contacts");
                HouseholdError::Internal(err)
            })?;

        Ok(contacts.into_iter().map(ContactDto::from).collect())
    }

    pub async fn update_contact(
        &self,
        user_id: Uuid,
        household_id: Uuid,
        contact_id: Uuid,
        model: UpdateContactModel,
    ) -> UseCaseResult<ContactDto> {
        if let Some(phone) = model.phone.as_deref() {
            validate_phone(phone)?;
        }
        if model.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(HouseholdError::Validation("name is required".to_string()));
        }

        self.ensure_owned_household(user_id, household_id).await?;
        let current = self.find_contact(household_id, contact_id).await?;

        let line_user_id = model.line_user_id.map(blank_to_none);
        let effective_line_user_id = match line_user_id.as_ref() {
            Some(value) => value.as_deref(),
            None => current.line_user_id.as_deref(),
        };
        validate_channels(
            model.notify_voice.unwrap_or(current.notify_voice),
            model.notify_sms.unwrap_or(current.notify_sms),
            model.notify_line.unwrap_or(current.notify_line),
            effective_line_user_id,
        )?;

        let changes = ContactChangeset {
            name: model.name.map(|name| name.trim().to_string()),
            phone: model.phone,
            line_user_id,
            relationship: model.relationship.map(blank_to_none),
            priority: model.priority,
            notify_voice: model.notify_voice,
            notify_sms: model.notify_sms,
            notify_line: model.notify_line,
        };

        let contact = self
            .contact_repo
            .update(contact_id, changes)
            .await
            .map_err(|err| {
                error!(%contact_id, db_error = ?err, "contacts: failed to update contact");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, %contact_id, "contacts: contact updated");
        Ok(ContactDto::from(contact))
    }

    pub async fn delete_contact(
        &self,
        user_id: Uuid,
        household_id: Uuid,
        contact_id: Uuid,
    ) -> UseCaseResult<()> {
        self.ensure_owned_household(user_id, household_id).await?;
        self.find_contact(household_id, contact_id).await?;

        self.contact_repo
            .delete(contact_id)
            .await
            .map_err(|err| {
                error!(%contact_id, db_error = ?err, "contacts: failed to delete contact");
                HouseholdError::Internal(err)
            })?;

        info!(%user_id, %household_id, %contact_id, "contacts: contact deleted");
        Ok(())
    }

    async fn ensure_owned_household(&self, user_id: Uuid, household_id: Uuid) -> UseCaseResult<()> {
        let household = self
            .household_repo
            .find_by_id(household_id)
            .await
            .map_err(|err| {
                error!(%household_id, db_error = ?err, "contacts: failed to load household");
                HouseholdError::Internal(err)
            })?;

        match household {
            Some(household) if household.user_id == user_id => Ok(()),
            _ => Err(HouseholdError::HouseholdNotFound),
        }
    }

    async fn find_contact(&self, household_id: Uuid, contact_id: Uuid) -> UseCaseResult<ContactEntity> {
        let contact = self
            .contact_repo
            .find_by_id(contact_id)
            .await
            .map_err(|err| {
                error!(%contact_id, db_error = ?err, "contacts: failed to load contact");
                HouseholdError::Internal(err)
            })?;

        match contact {
            Some(contact) if contact.household_id == household_id => Ok(contact),
            _ => Err(HouseholdError::ContactNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{households::tests::sample_household, plan_resolver::tests::resolver_mocks};
    use crates::domain::{
        repositories::{
            contacts::MockContactRepository, households::MockHouseholdRepository,
            plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
        },
        value_objects::plans::PlanFeatures,
    };

    fn create_model() -> CreateContactModel {
        CreateContactModel {
            name: "田中 一郎".to_string(),
            phone: "+818011112222".to_string(),
            line_user_id: None,
            relationship: Some("son".to_string()),
            priority: 1,
            notify_voice: true,
            notify_sms: true,
            notify_line: false,
        }
    }

    fn sample_contact(household_id: Uuid) -> ContactEntity {
        ContactEntity {
            id: Uuid::new_v4(),
            household_id,
            name: "田中 一郎".to_string(),
            phone: "+818011112222".to_string(),
            line_user_id: None,
            relationship: None,
            priority: 1,
            notify_voice: false,
            notify_sms: true,
            notify_line: false,
            created_at: Utc::now(),
        }
    }

    fn owned_household_repo(user_id: Uuid) -> (MockHouseholdRepository, Uuid) {
        let household = sample_household(user_id);
        let household_id = household.id;
        let mut household_repo = MockHouseholdRepository::new();
        household_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(household.clone())));
        (household_repo, household_id)
    }

    fn usecase(
        household_repo: MockHouseholdRepository,
        contact_repo: MockContactRepository,
        user_id: Uuid,
        max_contacts: i64,
    ) -> ContactUseCase<
        MockHouseholdRepository,
        MockContactRepository,
        MockPlanRepository,
        MockSubscriptionRepository,
    > {
        let (plan_repo, subscription_repo) = resolver_mocks(
            user_id,
            PlanFeatures {
                max_contacts: Some(max_contacts),
                ..PlanFeatures::default()
            },
        );
        ContactUseCase::new(
            Arc::new(household_repo),
            Arc::new(contact_repo),
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
        )
    }

    #[tokio::test]
    async fn adds_contact_within_limit() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned_household_repo(user_id);
        let contact_id = Uuid::new_v4();

        let mut contact_repo = MockContactRepository::new();
        contact_repo.expect_count_by_household().returning(|_| Ok(1));
        contact_repo
            .expect_create()
            .returning(move |_| Ok(contact_id));

        let dto = usecase(household_repo, contact_repo, user_id, 2)
            .add_contact(user_id, household_id, create_model())
            .await
            .unwrap();

        assert_eq!(dto.id, contact_id);
        assert_eq!(dto.household_id, household_id);
    }

    #[tokio::test]
    async fn contact_limit_is_enforced_per_household() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned_household_repo(user_id);

        let mut contact_repo = MockContactRepository::new();
        contact_repo.expect_count_by_household().returning(|_| Ok(2));
        contact_repo.expect_create().never();

        let err = usecase(household_repo, contact_repo, user_id, 2)
            .add_contact(user_id, household_id, create_model())
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::ContactLimitReached));
    }

    #[tokio::test]
    async fn line_flag_requires_line_user_id() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned_household_repo(user_id);

        let err = usecase(household_repo, MockContactRepository::new(), user_id, 2)
            .add_contact(
                user_id,
                household_id,
                CreateContactModel {
                    notify_line: true,
                    ..create_model()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::Validation(_)));
    }

    #[tokio::test]
    async fn update_cannot_disable_every_channel() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned_household_repo(user_id);
        let contact = sample_contact(household_id);
        let contact_id = contact.id;

        let mut contact_repo = MockContactRepository::new();
        contact_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(contact.clone())));
        contact_repo.expect_update().never();

        let err = usecase(household_repo, contact_repo, user_id, 2)
            .update_contact(
                user_id,
                household_id,
                contact_id,
                UpdateContactModel {
                    notify_sms: Some(false),
                    ..UpdateContactModel::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::Validation(_)));
    }

    #[tokio::test]
    async fn contact_of_another_household_is_not_found() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned_household_repo(user_id);
        let foreign = sample_contact(Uuid::new_v4());
        let contact_id = foreign.id;

        let mut contact_repo = MockContactRepository::new();
        contact_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(foreign.clone())));
        contact_repo.expect_delete().never();

        let err = usecase(household_repo, contact_repo, user_id, 2)
            .delete_contact(user_id, household_id, contact_id)
            .await
            .unwrap_err();

        assert!(matches!(err, HouseholdError::ContactNotFound));
    }
}
