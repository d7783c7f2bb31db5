use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::households::HouseholdEntity, value_objects::enums::notify_channels::NotifyChannel,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHouseholdModel {
    pub name: String,
    pub phone: String,
    pub address_grid: String,
    #[serde(default)]
    pub risk_flag: bool,
    pub notes: Option<String>,
    pub line_user_id: Option<String>,
    #[serde(default)]
    pub preferred_channel: NotifyChannel,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHouseholdModel {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address_grid: Option<String>,
    pub risk_flag: Option<bool>,
    pub notes: Option<String>,
    pub line_user_id: Option<String>,
    pub preferred_channel: Option<NotifyChannel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HouseholdDto {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub address_grid: String,
    pub risk_flag: bool,
    pub notes: Option<String>,
    pub line_user_id: Option<String>,
    pub preferred_channel: NotifyChannel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<HouseholdEntity> for HouseholdDto {
    fn from(value: HouseholdEntity) -> Self {
        let preferred_channel = value.preferred_channel();
        Self {
            id: value.id,
            name: value.name,
            phone: value.phone,
            address_grid: value.address_grid,
            risk_flag: value.risk_flag,
            notes: value.notes,
            line_user_id: value.line_user_id,
            preferred_channel,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// E.164: a leading `+` and 8 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    match phone.strip_prefix('+') {
        Some(digits) => {
            (8..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// JMA mesh codes are 6 (secondary), 8 (tertiary) or up to 10 digit grid ids.
pub fn is_valid_address_grid(grid: &str) -> bool {
    (6..=10).contains(&grid.len()) && grid.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_must_be_e164() {
        assert!(is_valid_phone("+819012345678"));
        assert!(!is_valid_phone("09012345678"));
        assert!(!is_valid_phone("+81-90-1234"));
        assert!(!is_valid_phone("+1234567"));
    }

    #[test]
    fn address_grid_is_a_digit_mesh_code() {
        assert!(is_valid_address_grid("533945"));
        assert!(is_valid_address_grid("53394611"));
        assert!(!is_valid_address_grid("5339"));
        assert!(!is_valid_address_grid("53a945"));
    }
}
