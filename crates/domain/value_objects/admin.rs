use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::app_users::AppUserEntity;

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppUserDto {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<AppUserEntity> for AppUserDto {
    fn from(value: AppUserEntity) -> Self {
        Self {
            id: value.id,
            email: value.email,
            role: value.role,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminStatsDto {
    pub users: i64,
    pub households: i64,
    pub alerts_last_24h: BTreeMap<String, i64>,
    pub active_subscriptions: BTreeMap<String, i64>,
}
