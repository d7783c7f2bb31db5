use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertEventKind {
    Created,
    CallPlaced,
    Response,
    Transition,
    FamilyNotified,
    StaffNotified,
    DispatchFailed,
}

impl AlertEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertEventKind::Created => "created",
            AlertEventKind::CallPlaced => "call_placed",
            AlertEventKind::Response => "response",
            AlertEventKind::Transition => "transition",
            AlertEventKind::FamilyNotified => "family_notified",
            AlertEventKind::StaffNotified => "staff_notified",
            AlertEventKind::DispatchFailed => "dispatch_failed",
        }
    }
}

impl Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
