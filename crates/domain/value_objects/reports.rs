use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    #[default]
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: ReportFormat,
}

/// One exported alert. Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertReportRow {
    pub alert_id: Uuid,
    pub household_name: Option<String>,
    pub address_grid: Option<String>,
    pub status: String,
    pub level: String,
    pub wbgt: f64,
    pub attempts: i32,
    pub last_response_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
