use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::plan_codes::PlanCode,
        plans::{FREE_PLAN_ID, PlanFeatures},
    },
    infra::db::postgres::schema::plans,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntity {
    pub id: Uuid,
    pub code: PlanCode,
    pub name: Option<String>,
    pub price_minor: i32,
    pub duration_days: i32,
    pub features: PlanFeatures,
    pub is_active: bool,
    pub stripe_price_recurring: Option<String>,
}

impl PlanEntity {
    /// Built-in free plan, used when the free plan row has not been seeded.
    pub fn free_tier() -> Self {
        Self {
            id: FREE_PLAN_ID,
            code: PlanCode::Free,
            name: Some("Free".to_string()),
            price_minor: 0,
            duration_days: 0,
            features: PlanFeatures::free_tier(),
            is_active: true,
            stripe_price_recurring: None,
        }
    }
}

/// Raw row used for Diesel queries. Features stay as JSON and are parsed into PlanFeatures.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub price_minor: i32,
    pub duration_days: i32,
    pub features: serde_json::Value,
    pub is_active: bool,
    pub stripe_price_recurring: Option<String>,
}

impl From<PlanRow> for PlanEntity {
    fn from(value: PlanRow) -> Self {
        let features = serde_json::from_value(value.features).unwrap_or_default();

        Self {
            id: value.id,
            code: PlanCode::from_str(&value.code),
            name: value.name,
            price_minor: value.price_minor,
            duration_days: value.duration_days,
            features,
            is_active: value.is_active,
            stripe_price_recurring: value.stripe_price_recurring,
        }
    }
}
