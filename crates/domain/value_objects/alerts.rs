use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{alert_events::AlertEventEntity, alerts::AlertEntity},
    value_objects::enums::alert_statuses::AlertStatus,
};

/// Answer a household gives to a check-in, by keypad digit or LINE button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallResponse {
    Ok,
    Tired,
    Help,
}

impl CallResponse {
    pub fn from_digit(digits: &str) -> Option<Self> {
        match digits.trim() {
            "1" => Some(CallResponse::Ok),
            "2" => Some(CallResponse::Tired),
            "3" => Some(CallResponse::Help),
            _ => None,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(CallResponse::Ok),
            "tired" => Some(CallResponse::Tired),
            "help" => Some(CallResponse::Help),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallResponse::Ok => "ok",
            CallResponse::Tired => "tired",
            CallResponse::Help => "help",
        }
    }

    pub fn target_status(&self) -> AlertStatus {
        match self {
            CallResponse::Ok => AlertStatus::Ok,
            CallResponse::Tired => AlertStatus::Tired,
            CallResponse::Help => AlertStatus::Help,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertListFilter {
    pub status: Option<AlertStatus>,
    pub household_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAlertStatusModel {
    pub status: AlertStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WbgtReading {
    pub address_grid: String,
    pub wbgt: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestWbgtModel {
    pub readings: Vec<WbgtReading>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IngestWbgtResult {
    pub created_alert_ids: Vec<Uuid>,
    pub skipped_open_alerts: usize,
    pub below_threshold: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDto {
    pub id: Uuid,
    pub household_id: Uuid,
    pub status: String,
    pub wbgt: f64,
    pub level: String,
    pub attempts: i32,
    pub last_call_at: Option<DateTime<Utc>>,
    pub last_response_code: Option<String>,
    pub last_channel: Option<String>,
    pub family_notified_at: Option<DateTime<Utc>>,
    pub staff_notified_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AlertEntity> for AlertDto {
    fn from(value: AlertEntity) -> Self {
        Self {
            id: value.id,
            household_id: value.household_id,
            status: value.status,
            wbgt: value.wbgt,
            level: value.level,
            attempts: value.attempts,
            last_call_at: value.last_call_at,
            last_response_code: value.last_response_code,
            last_channel: value.last_channel,
            family_notified_at: value.family_notified_at,
            staff_notified_at: value.staff_notified_at,
            resolved_at: value.resolved_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertEventDto {
    pub kind: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub channel: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AlertEventEntity> for AlertEventDto {
    fn from(value: AlertEventEntity) -> Self {
        Self {
            kind: value.kind,
            from_status: value.from_status,
            to_status: value.to_status,
            channel: value.channel,
            detail: value.detail,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDetailDto {
    #[serde(flatten)]
    pub alert: AlertDto,
    pub events: Vec<AlertEventDto>,
}

/// Decides whether a WBGT reading should open an alert for a household.
///
/// Households flagged at risk are alerted `risk_margin` degrees earlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub wbgt_threshold: f64,
    pub risk_margin: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            wbgt_threshold: 28.0,
            risk_margin: 3.0,
        }
    }
}

impl AlertThresholds {
    pub fn should_alert(&self, wbgt: f64, risk_flag: bool) -> bool {
        let threshold = if risk_flag {
            self.wbgt_threshold - self.risk_margin
        } else {
            self.wbgt_threshold
        };
        wbgt >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_digits_map_to_responses() {
        assert_eq!(CallResponse::from_digit("1"), Some(CallResponse::Ok));
        assert_eq!(CallResponse::from_digit("2"), Some(CallResponse::Tired));
        assert_eq!(CallResponse::from_digit(" 3 "), Some(CallResponse::Help));
        assert_eq!(CallResponse::from_digit("9"), None);
        assert_eq!(CallResponse::from_digit(""), None);
    }

    #[test]
    fn at_risk_households_are_alerted_earlier() {
        let thresholds = AlertThresholds::default();

        assert!(!thresholds.should_alert(26.0, false));
        assert!(thresholds.should_alert(26.0, true));
        assert!(thresholds.should_alert(28.0, false));
        assert!(!thresholds.should_alert(24.9, true));
    }
}
