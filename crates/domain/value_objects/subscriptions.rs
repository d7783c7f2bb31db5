use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{plans::PlanEntity, subscriptions::SubscriptionEntity};
use crate::domain::value_objects::enums::{
    plan_codes::PlanCode, subscription_statuses::SubscriptionStatus,
};
use crate::domain::value_objects::plans::PlanFeatures;

#[derive(Debug, Serialize)]
pub struct PlanDto {
    pub id: Uuid,
    pub code: PlanCode,
    pub name: Option<String>,
    pub price_minor: i32,
    pub duration_days: i32,
    pub features: PlanFeatures,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            price_minor: value.price_minor,
            duration_days: value.duration_days,
            features: value.features,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionDto {
    pub plan_id: Uuid,
    pub plan_code: PlanCode,
    pub plan_name: Option<String>,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub features: PlanFeatures,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            plan_id: value.plan_id,
            status: SubscriptionStatus::from_str(&value.status),
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            cancel_at_period_end: value.cancel_at_period_end,
            canceled_at: value.canceled_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub checkout_url: String,
}
