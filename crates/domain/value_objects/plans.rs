use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed UUID representing the free plan.
pub const FREE_PLAN_ID: Uuid = Uuid::nil();

/// Limits and feature flags attached to a plan. Stored as JSONB in the database.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PlanFeatures {
    #[serde(default)]
    pub max_households: Option<i64>,

    #[serde(default)]
    pub max_contacts: Option<i64>,

    #[serde(default)]
    pub line_enabled: Option<bool>,

    #[serde(default)]
    pub staff_escalation: Option<bool>,

    #[serde(default)]
    pub csv_export: Option<bool>,
}

impl PlanFeatures {
    /// Limits applied when a user has no paid subscription.
    pub fn free_tier() -> Self {
        Self {
            max_households: Some(1),
            max_contacts: Some(2),
            line_enabled: Some(false),
            staff_escalation: Some(false),
            csv_export: Some(false),
        }
    }

    pub fn max_households_or_default(&self) -> i64 {
        self.max_households.unwrap_or(1)
    }

    pub fn max_contacts_or_default(&self) -> i64 {
        self.max_contacts.unwrap_or(2)
    }

    pub fn has_line(&self) -> bool {
        self.line_enabled.unwrap_or(false)
    }

    pub fn has_staff_escalation(&self) -> bool {
        self.staff_escalation.unwrap_or(false)
    }

    pub fn has_csv_export(&self) -> bool {
        self.csv_export.unwrap_or(false)
    }
}
