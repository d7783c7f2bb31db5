use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::{
        alert_events::InsertAlertEventEntity,
        alerts::{AlertChangeset, AlertEntity},
    },
    repositories::{alerts::AlertRepository, households::HouseholdRepository},
    value_objects::{
        alerts::{AlertDetailDto, AlertDto, AlertEventDto, AlertListFilter, UpdateAlertStatusModel},
        enums::alert_statuses::AlertStatus,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert not found")]
    AlertNotFound,
    #[error("admin role required")]
    Forbidden,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },
    #[error("stale alert status")]
    StaleStatus,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AlertError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AlertError::AlertNotFound => StatusCode::NOT_FOUND,
            AlertError::Forbidden => StatusCode::FORBIDDEN,
            AlertError::Validation(_) => StatusCode::BAD_REQUEST,
            AlertError::InvalidTransition { .. } | AlertError::StaleStatus => StatusCode::CONFLICT,
            AlertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AlertError>;

/// Column changes that accompany an operator moving an alert to `next`.
pub fn operator_changes(next: AlertStatus) -> AlertChangeset {
    let now = Utc::now();
    let mut changes = AlertChangeset {
        status: Some(next.to_string()),
        ..AlertChangeset::default()
    };

    match next {
        AlertStatus::Ok | AlertStatus::Completed => {
            changes.resolved_at = Some(Some(now));
            changes.next_action_at = Some(None);
        }
        AlertStatus::InProgress => {
            changes.next_action_at = Some(None);
        }
        AlertStatus::Tired | AlertStatus::Help => {
            changes.last_response_code = Some(Some(next.to_string()));
            changes.next_action_at = Some(Some(now));
        }
        AlertStatus::Escalated | AlertStatus::Unanswered => {
            changes.next_action_at = Some(Some(now));
        }
    }

    changes
}

pub struct AlertUseCase<A, H>
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    alert_repo: Arc<A>,
    household_repo: Arc<H>,
}

impl<A, H> AlertUseCase<A, H>
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    pub fn new(alert_repo: Arc<A>, household_repo: Arc<H>) -> Self {
        Self {
            alert_repo,
            household_repo,
        }
    }

    pub async fn list_alerts(
        &self,
        user_id: Uuid,
        is_admin: bool,
        mut filter: AlertListFilter,
    ) -> UseCaseResult<Vec<AlertDto>> {
        if let Some(limit) = filter.limit {
            filter.limit = Some(limit.clamp(1, MAX_LIST_LIMIT));
        }
        let owner_id = (!is_admin).then_some(user_id);

        let alerts = self
            .alert_repo
            .list_alerts(owner_id, filter)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "alerts: failed to list alerts");
                AlertError::Internal(err)
            })?;

        Ok(alerts.into_iter().map(AlertDto::from).collect())
    }

    pub async fn get_alert(
        &self,
        user_id: Uuid,
        is_admin: bool,
        alert_id: Uuid,
    ) -> UseCaseResult<AlertDetailDto> {
        let alert = self.find_visible(user_id, is_admin, alert_id).await?;

        let events = self
            .alert_repo
            .list_events(alert_id)
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "alerts: failed to list alert events");
                AlertError::Internal(err)
            })?;

        Ok(AlertDetailDto {
            alert: AlertDto::from(alert),
            events: events.into_iter().map(AlertEventDto::from).collect(),
        })
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        is_admin: bool,
        alert_id: Uuid,
        model: UpdateAlertStatusModel,
    ) -> UseCaseResult<AlertDto> {
        let alert = self.find_visible(user_id, is_admin, alert_id).await?;
        let current = alert.status().ok_or_else(|| {
            AlertError::Internal(anyhow::anyhow!("alert {alert_id} has unknown status {}", alert.status))
        })?;

        if !current.can_transition_to(model.status) {
            warn!(
                %user_id,
                %alert_id,
                from = %current,
                to = %model.status,
                "alerts: rejected status transition"
            );
            return Err(AlertError::InvalidTransition {
                from: current,
                to: model.status,
            });
        }

        let changes = operator_changes(model.status);
        let mut event = InsertAlertEventEntity::transition(alert_id, current, model.status)
            .with_detail(format!("operator={user_id}"));
        if let Some(note) = model.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            event = event.with_detail(format!("operator={user_id} note={note}"));
        }

        let applied = self
            .alert_repo
            .update_alert(alert_id, current, changes, Some(event))
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "alerts: failed to update alert status");
                AlertError::Internal(err)
            })?;

        if !applied {
            warn!(%alert_id, expected = %current, "alerts: status changed concurrently");
            return Err(AlertError::StaleStatus);
        }

        info!(%user_id, %alert_id, from = %current, to = %model.status, "alerts: status updated");

        let updated = self
            .alert_repo
            .find_by_id(alert_id)
            .await
            .map_err(AlertError::Internal)?
            .ok_or(AlertError::AlertNotFound)?;

        Ok(AlertDto::from(updated))
    }

    /// Owners see alerts of their households; admins see every alert.
    async fn find_visible(
        &self,
        user_id: Uuid,
        is_admin: bool,
        alert_id: Uuid,
    ) -> UseCaseResult<AlertEntity> {
        let alert = self
            .alert_repo
            .find_by_id(alert_id)
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "alerts: failed to load alert");
                AlertError::Internal(err)
            })?
            .ok_or(AlertError::AlertNotFound)?;

        if is_admin {
            return Ok(alert);
        }

        let household = self
            .household_repo
            .find_by_id(alert.household_id)
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "alerts: failed to load household");
                AlertError::Internal(err)
            })?;

        match household {
            Some(household) if household.user_id == user_id => Ok(alert),
            _ => Err(AlertError::AlertNotFound),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::usecases::households::tests::sample_household;
    use crates::domain::repositories::{
        alerts::MockAlertRepository, households::MockHouseholdRepository,
    };
    use mockall::predicate::eq;

    pub(crate) fn sample_alert(household_id: Uuid, status: AlertStatus) -> AlertEntity {
        let now = Utc::now();
        AlertEntity {
            id: Uuid::new_v4(),
            household_id,
            status: status.to_string(),
            wbgt: 30.2,
            level: "severe".to_string(),
            attempts: 1,
            last_call_at: Some(now),
            last_response_code: None,
            last_channel: Some("voice".to_string()),
            last_error: None,
            next_action_at: Some(now),
            family_notified_at: None,
            staff_notified_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn owned(user_id: Uuid) -> (MockHouseholdRepository, Uuid) {
        let household = sample_household(user_id);
        let household_id = household.id;
        let mut household_repo = MockHouseholdRepository::new();
        household_repo
            .expect_find_by_id()
            .with(eq(household_id))
            .returning(move |_| Ok(Some(household.clone())));
        (household_repo, household_id)
    }

    #[tokio::test]
    async fn operator_completes_a_tired_alert() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned(user_id);
        let alert = sample_alert(household_id, AlertStatus::Tired);
        let alert_id = alert.id;
        let completed = AlertEntity {
            status: "completed".to_string(),
            resolved_at: Some(Utc::now()),
            ..alert.clone()
        };

        let mut alert_repo = MockAlertRepository::new();
        let mut seq = mockall::Sequence::new();
        alert_repo
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(alert.clone())));
        alert_repo
            .expect_update_alert()
            .withf(move |id, expected, changes, event| {
                *id == alert_id
                    && *expected == AlertStatus::Tired
                    && changes.status.as_deref() == Some("completed")
                    && changes.next_action_at == Some(None)
                    && event
                        .as_ref()
                        .is_some_and(|e| e.detail.as_deref().is_some_and(|d| d.contains("note=called")))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(true));
        alert_repo
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(completed.clone())));

        let dto = AlertUseCase::new(Arc::new(alert_repo), Arc::new(household_repo))
            .update_status(
                user_id,
                false,
                alert_id,
                UpdateAlertStatusModel {
                    status: AlertStatus::Completed,
                    note: Some("called neighbour".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(dto.status, "completed");
    }

    #[tokio::test]
    async fn help_cannot_jump_to_completed() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned(user_id);
        let alert = sample_alert(household_id, AlertStatus::Help);
        let alert_id = alert.id;

        let mut alert_repo = MockAlertRepository::new();
        alert_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(alert.clone())));
        alert_repo.expect_update_alert().never();

        let err = AlertUseCase::new(Arc::new(alert_repo), Arc::new(household_repo))
            .update_status(
                user_id,
                false,
                alert_id,
                UpdateAlertStatusModel {
                    status: AlertStatus::Completed,
                    note: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AlertError::InvalidTransition { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn concurrent_writer_wins_with_stale_status() {
        let user_id = Uuid::new_v4();
        let (household_repo, household_id) = owned(user_id);
        let alert = sample_alert(household_id, AlertStatus::Escalated);
        let alert_id = alert.id;

        let mut alert_repo = MockAlertRepository::new();
        alert_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(alert.clone())));
        alert_repo
            .expect_update_alert()
            .returning(|_, _, _, _| Ok(false));

        let err = AlertUseCase::new(Arc::new(alert_repo), Arc::new(household_repo))
            .update_status(
                user_id,
                false,
                alert_id,
                UpdateAlertStatusModel {
                    status: AlertStatus::InProgress,
                    note: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AlertError::StaleStatus));
    }

    #[tokio::test]
    async fn stranger_cannot_see_alert() {
        let owner_id = Uuid::new_v4();
        let (household_repo, household_id) = owned(owner_id);
        let alert = sample_alert(household_id, AlertStatus::Unanswered);
        let alert_id = alert.id;

        let mut alert_repo = MockAlertRepository::new();
        alert_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(alert.clone())));
        alert_repo.expect_list_events().never();

        let err = AlertUseCase::new(Arc::new(alert_repo), Arc::new(household_repo))
            .get_alert(Uuid::new_v4(), false, alert_id)
            .await
            .unwrap_err();

        assert!(matches!(err, AlertError::AlertNotFound));
    }

    #[tokio::test]
    async fn admin_lists_across_owners_and_limit_is_clamped() {
        let mut alert_repo = MockAlertRepository::new();
        alert_repo
            .expect_list_alerts()
            .withf(|owner_id, filter| owner_id.is_none() && filter.limit == Some(MAX_LIST_LIMIT))
            .returning(|_, _| Ok(Vec::new()));

        let alerts = AlertUseCase::new(
            Arc::new(alert_repo),
            Arc::new(MockHouseholdRepository::new()),
        )
        .list_alerts(
            Uuid::new_v4(),
            true,
            AlertListFilter {
                limit: Some(10_000),
                ..AlertListFilter::default()
            },
        )
        .await
        .unwrap();

        assert!(alerts.is_empty());
    }

    #[test]
    fn operator_changes_stop_or_resume_escalation() {
        assert_eq!(
            operator_changes(AlertStatus::InProgress).next_action_at,
            Some(None)
        );
        assert!(matches!(
            operator_changes(AlertStatus::Escalated).next_action_at,
            Some(Some(_))
        ));
        assert!(operator_changes(AlertStatus::Completed).resolved_at.is_some());
    }
}
