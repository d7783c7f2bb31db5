use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::alert_statuses::AlertStatus,
    infra::db::postgres::schema::alerts,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = alerts)]
pub struct AlertEntity {
    pub id: Uuid,
    pub household_id: Uuid,
    pub status: String,
    pub wbgt: f64,
    pub level: String,
    pub attempts: i32,
    pub last_call_at: Option<DateTime<Utc>>,
    pub last_response_code: Option<String>,
    pub last_channel: Option<String>,
    pub last_error: Option<String>,
    pub next_action_at: Option<DateTime<Utc>>,
    pub family_notified_at: Option<DateTime<Utc>>,
    pub staff_notified_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertEntity {
    pub fn status(&self) -> Option<AlertStatus> {
        AlertStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = alerts)]
pub struct InsertAlertEntity {
    pub household_id: Uuid,
    pub status: String,
    pub wbgt: f64,
    pub level: String,
    pub attempts: i32,
    pub next_action_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of an alert row. Outer `None` skips the column, `Some(None)`
/// clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = alerts)]
pub struct AlertChangeset {
    pub status: Option<String>,
    pub attempts: Option<i32>,
    pub last_call_at: Option<Option<DateTime<Utc>>>,
    pub last_response_code: Option<Option<String>>,
    pub last_channel: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
    pub next_action_at: Option<Option<DateTime<Utc>>>,
    pub family_notified_at: Option<Option<DateTime<Utc>>>,
    pub staff_notified_at: Option<Option<DateTime<Utc>>>,
    pub resolved_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}
