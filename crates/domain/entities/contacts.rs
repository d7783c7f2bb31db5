use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::contacts;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = contacts)]
pub struct ContactEntity {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub phone: String,
    pub line_user_id: Option<String>,
    pub relationship: Option<String>,
    pub priority: i32,
    pub notify_voice: bool,
    pub notify_sms: bool,
    pub notify_line: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contacts)]
pub struct InsertContactEntity {
    pub household_id: Uuid,
    pub name: String,
    pub phone: String,
    pub line_user_id: Option<String>,
    pub relationship: Option<String>,
    pub priority: i32,
    pub notify_voice: bool,
    pub notify_sms: bool,
    pub notify_line: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = contacts)]
pub struct ContactChangeset {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub line_user_id: Option<Option<String>>,
    pub relationship: Option<Option<String>>,
    pub priority: Option<i32>,
    pub notify_voice: Option<bool>,
    pub notify_sms: Option<bool>,
    pub notify_line: Option<bool>,
}
