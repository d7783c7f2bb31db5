use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::contacts::ContactEntity;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactModel {
    pub name: String,
    pub phone: String,
    pub line_user_id: Option<String>,
    pub relationship: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub notify_voice: bool,
    #[serde(default = "default_true")]
    pub notify_sms: bool,
    #[serde(default)]
    pub notify_line: bool,
}

fn default_priority() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContactModel {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub line_user_id: Option<String>,
    pub relationship: Option<String>,
    pub priority: Option<i32>,
    pub notify_voice: Option<bool>,
    pub notify_sms: Option<bool>,
    pub notify_line: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactDto {
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

impl From<ContactEntity> for ContactDto {
    fn from(value: ContactEntity) -> Self {
        Self {
            id: value.id,
            household_id: value.household_id,
            name: value.name,
            phone: value.phone,
            line_user_id: value.line_user_id,
            relationship: value.relationship,
            priority: value.priority,
            notify_voice: value.notify_voice,
            notify_sms: value.notify_sms,
            notify_line: value.notify_line,
            created_at: value.created_at,
        }
    }
}
