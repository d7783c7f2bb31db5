use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanCode {
    #[default]
    Free,
    Personal,
    Family,
    Business,
}

impl PlanCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanCode::Free => "free",
            PlanCode::Personal => "personal",
            PlanCode::Family => "family",
            PlanCode::Business => "business",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "personal" => PlanCode::Personal,
            "family" => PlanCode::Family,
            "business" => PlanCode::Business,
            _ => PlanCode::Free,
        }
    }
}

impl Display for PlanCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
