use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    dsl::count_star,
    insert_into,
    prelude::*,
    result::DatabaseErrorKind,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{alert_events, alerts, households},
    },
};
use domain::{
    entities::{
        alert_events::{AlertEventEntity, InsertAlertEventEntity},
        alerts::{AlertChangeset, AlertEntity, InsertAlertEntity},
    },
    repositories::alerts::AlertRepository,
    value_objects::{
        alerts::AlertListFilter,
        enums::{alert_event_kinds::AlertEventKind, alert_statuses::AlertStatus},
        reports::AlertReportRow,
    },
};

const DEFAULT_LIST_LIMIT: i64 = 100;

/// Alerts created in `[from, to)` with their household's name and grid.
/// An owner filter goes through the joined household row, so an owner's
/// report leaves out alerts whose household was deleted; the unfiltered
/// admin report still lists them with empty household columns.
macro_rules! report_rows_query {
    ($owner_id:expr, $from:expr, $to:expr) => {{
        let mut query = alerts::table
            .left_join(households::table)
            .filter(alerts::created_at.ge($from))
            .filter(alerts::created_at.lt($to))
            .order(alerts::created_at.asc())
            .select((
                alerts::id,
                households::name.nullable(),
                households::address_grid.nullable(),
                alerts::status,
                alerts::level,
                alerts::wbgt,
                alerts::attempts,
                alerts::last_response_code,
                alerts::created_at,
                alerts::resolved_at,
            ))
            .into_boxed::<diesel::pg::Pg>();

        if let Some(owner_id) = $owner_id {
            query = query.filter(households::user_id.eq(owner_id));
        }

        query
    }};
}

type ReportTuple = (
    Uuid,
    Option<String>,
    Option<String>,
    String,
    String,
    f64,
    i32,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

pub struct AlertPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AlertPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

const ONE_OPEN_ALERT_INDEX: &str = "alerts_one_open_per_household";

fn is_open_alert_conflict(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(ONE_OPEN_ALERT_INDEX)
    )
}

fn open_statuses() -> Vec<&'static str> {
    AlertStatus::OPEN.iter().map(AlertStatus::as_str).collect()
}

#[async_trait]
impl AlertRepository for AlertPostgres {
    async fn create_alert(&self, insert_alert_entity: InsertAlertEntity) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = conn.transaction::<Uuid, diesel::result::Error, _>(|conn| {
            let alert_id = insert_into(alerts::table)
                .values(&insert_alert_entity)
                .returning(alerts::id)
                .get_result::<Uuid>(conn)?;

            let created = InsertAlertEventEntity {
                to_status: Some(insert_alert_entity.status.clone()),
                ..InsertAlertEventEntity::new(alert_id, AlertEventKind::Created)
            }
            .with_detail(format!(
                "wbgt={:.1} level={}",
                insert_alert_entity.wbgt, insert_alert_entity.level
            ));

            insert_into(alert_events::table)
                .values(&created)
                .execute(conn)?;

            Ok(alert_id)
        });

        match inserted {
            Ok(alert_id) => Ok(Some(alert_id)),
            Err(err) if is_open_alert_conflict(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, alert_id: Uuid) -> Result<Option<AlertEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let alert = alerts::table
            .find(alert_id)
            .select(AlertEntity::as_select())
            .first::<AlertEntity>(&mut conn)
            .optional()?;

        Ok(alert)
    }

    async fn find_open_alert_for_household(
        &self,
        household_id: Uuid,
    ) -> Result<Option<AlertEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let alert = alerts::table
            .filter(alerts::household_id.eq(household_id))
            .filter(alerts::status.eq_any(open_statuses()))
            .order(alerts::created_at.desc())
            .select(AlertEntity::as_select())
            .first::<AlertEntity>(&mut conn)
            .optional()?;

        Ok(alert)
    }

    async fn list_alerts(
        &self,
        owner_id: Option<Uuid>,
        filter: AlertListFilter,
    ) -> Result<Vec<AlertEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = alerts::table
            .select(AlertEntity::as_select())
            .order(alerts::created_at.desc())
            .limit(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .into_boxed();

        if let Some(owner_id) = owner_id {
            query = query.filter(
                alerts::household_id.eq_any(
                    households::table
                        .filter(households::user_id.eq(owner_id))
                        .select(households::id),
                ),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(alerts::status.eq(status.as_str()));
        }
        if let Some(household_id) = filter.household_id {
            query = query.filter(alerts::household_id.eq(household_id));
        }

        let results = query.load::<AlertEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_events(&self, alert_id: Uuid) -> Result<Vec<AlertEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let events = alert_events::table
            .filter(alert_events::alert_id.eq(alert_id))
            .order(alert_events::created_at.asc())
            .select(AlertEventEntity::as_select())
            .load::<AlertEventEntity>(&mut conn)?;

        Ok(events)
    }

    async fn update_alert(
        &self,
        alert_id: Uuid,
        expected_status: AlertStatus,
        changes: AlertChangeset,
        event: Option<InsertAlertEventEntity>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let changes = AlertChangeset {
            updated_at: Some(Utc::now()),
            ..changes
        };

        let applied = conn.transaction::<bool, diesel::result::Error, _>(|conn| {
            let updated_rows = update(
                alerts::table
                    .filter(alerts::id.eq(alert_id))
                    .filter(alerts::status.eq(expected_status.as_str())),
            )
            .set(&changes)
            .execute(conn)?;

            if updated_rows == 0 {
                return Ok(false);
            }

            if let Some(event) = event.as_ref() {
                insert_into(alert_events::table)
                    .values(event)
                    .execute(conn)?;
            }

            Ok(true)
        })?;

        Ok(applied)
    }

    async fn append_events(&self, events: Vec<InsertAlertEventEntity>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(alert_events::table)
            .values(&events)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn park_alert(&self, alert_id: Uuid, reason: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let event = InsertAlertEventEntity::new(alert_id, AlertEventKind::DispatchFailed)
            .with_detail(reason.clone());

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            update(alerts::table.filter(alerts::id.eq(alert_id)))
                .set((
                    alerts::next_action_at.eq(None::<DateTime<Utc>>),
                    alerts::last_error.eq(Some(reason)),
                    alerts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            insert_into(alert_events::table)
                .values(&event)
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn claim_due_alerts(
        &self,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AlertEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let claimed = conn.transaction::<Vec<AlertEntity>, diesel::result::Error, _>(|conn| {
            let due = alerts::table
                .select(AlertEntity::as_select())
                .filter(alerts::next_action_at.le(now))
                .filter(alerts::status.eq_any(open_statuses()))
                .order(alerts::next_action_at.asc())
                .limit(limit)
                .for_update()
                .skip_locked()
                .load::<AlertEntity>(conn)?;

            if due.is_empty() {
                return Ok(due);
            }

            let ids: Vec<Uuid> = due.iter().map(|alert| alert.id).collect();
            update(alerts::table.filter(alerts::id.eq_any(&ids)))
                .set(alerts::next_action_at.eq(Some(lease_until)))
                .execute(conn)?;

            Ok(due)
        })?;

        Ok(claimed)
    }

    async fn list_report_rows(
        &self,
        owner_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AlertReportRow>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let query = report_rows_query!(owner_id, from, to);

        let rows = query
            .load::<ReportTuple>(&mut conn)?
            .into_iter()
            .map(
                |(
                    alert_id,
                    household_name,
                    address_grid,
                    status,
                    level,
                    wbgt,
                    attempts,
                    last_response_code,
                    created_at,
                    resolved_at,
                )| AlertReportRow {
                    alert_id,
                    household_name,
                    address_grid,
                    status,
                    level,
                    wbgt,
                    attempts,
                    last_response_code,
                    created_at,
                    resolved_at,
                },
            )
            .collect();

        Ok(rows)
    }

    async fn count_by_status_since(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let counts = alerts::table
            .filter(alerts::created_at.ge(since))
            .group_by(alerts::status)
            .select((alerts::status, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        Ok(counts)
    }
}
