use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    #[default]
    Voice,
    Sms,
    Line,
}

impl NotifyChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyChannel::Voice => "voice",
            NotifyChannel::Sms => "sms",
            NotifyChannel::Line => "line",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "voice" => Some(NotifyChannel::Voice),
            "sms" => Some(NotifyChannel::Sms),
            "line" => Some(NotifyChannel::Line),
            _ => None,
        }
    }
}

impl Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
