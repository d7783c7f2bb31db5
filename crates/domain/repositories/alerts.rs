use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        alert_events::{AlertEventEntity, InsertAlertEventEntity},
        alerts::{AlertChangeset, AlertEntity, InsertAlertEntity},
    },
    value_objects::{
        alerts::AlertListFilter, enums::alert_statuses::AlertStatus, reports::AlertReportRow,
    },
};

#[automock]
#[async_trait]
pub trait AlertRepository {
    /// Inserts the alert together with its `created` event. Returns `None`
    /// when the household already has an open alert.
    async fn create_alert(&self, insert_alert_entity: InsertAlertEntity) -> Result<Option<Uuid>>;

    async fn find_by_id(&self, alert_id: Uuid) -> Result<Option<AlertEntity>>;

    async fn find_open_alert_for_household(&self, household_id: Uuid)
    -> Result<Option<AlertEntity>>;

    /// `owner_id = None` lists across all owners.
    async fn list_alerts(
        &self,
        owner_id: Option<Uuid>,
        filter: AlertListFilter,
    ) -> Result<Vec<AlertEntity>>;

    async fn list_events(&self, alert_id: Uuid) -> Result<Vec<AlertEventEntity>>;

    /// Applies `changes` only while the row still has `expected_status`, and
    /// records `event` in the same transaction. Returns `false` when another
    /// writer moved the alert first.
    async fn update_alert(
        &self,
        alert_id: Uuid,
        expected_status: AlertStatus,
        changes: AlertChangeset,
        event: Option<InsertAlertEventEntity>,
    ) -> Result<bool>;

    async fn append_events(&self, events: Vec<InsertAlertEventEntity>) -> Result<()>;

    /// Takes the alert out of the escalation queue whatever its status, and
    /// records `reason` as a `dispatch_failed` event.
    async fn park_alert(&self, alert_id: Uuid, reason: String) -> Result<()>;

    /// Locks due alerts with `SKIP LOCKED` and pushes their `next_action_at`
    /// to `lease_until` so concurrent workers leave them alone.
    async fn claim_due_alerts(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AlertEntity>>;

    async fn list_report_rows(
        &self,
        owner_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AlertReportRow>>;

    async fn count_by_status_since(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>>;
}
