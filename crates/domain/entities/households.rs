use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::notify_channels::NotifyChannel,
    infra::db::postgres::schema::households,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = households)]
pub struct HouseholdEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address_grid: String,
    pub risk_flag: bool,
    pub notes: Option<String>,
    pub line_user_id: Option<String>,
    pub preferred_channel: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HouseholdEntity {
    pub fn preferred_channel(&self) -> NotifyChannel {
        NotifyChannel::from_str(&self.preferred_channel).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = households)]
pub struct InsertHouseholdEntity {
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address_grid: String,
    pub risk_flag: bool,
    pub notes: Option<String>,
    pub line_user_id: Option<String>,
    pub preferred_channel: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = households)]
pub struct HouseholdChangeset {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_grid: Option<String>,
    pub risk_flag: Option<bool>,
    pub notes: Option<Option<String>>,
    pub line_user_id: Option<Option<String>>,
    pub preferred_channel: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
