use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::{
        alert_event_kinds::AlertEventKind, alert_statuses::AlertStatus,
        notify_channels::NotifyChannel,
    },
    infra::db::postgres::schema::alert_events,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = alert_events)]
pub struct AlertEventEntity {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub kind: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub channel: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = alert_events)]
pub struct InsertAlertEventEntity {
    pub alert_id: Uuid,
    pub kind: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub channel: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InsertAlertEventEntity {
    pub fn new(alert_id: Uuid, kind: AlertEventKind) -> Self {
        Self {
            alert_id,
            kind: kind.to_string(),
            from_status: None,
            to_status: None,
            channel: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn transition(alert_id: Uuid, from: AlertStatus, to: AlertStatus) -> Self {
        Self {
            from_status: Some(from.to_string()),
            to_status: Some(to.to_string()),
            ..Self::new(alert_id, AlertEventKind::Transition)
        }
    }

    pub fn with_channel(mut self, channel: NotifyChannel) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
