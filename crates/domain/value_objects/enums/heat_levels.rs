use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Heat-stress tiers of the WBGT index, as published for the Japanese heat
/// illness prevention guideline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    Safe,
    Caution,
    Warning,
    Severe,
    Danger,
}

impl HeatLevel {
    pub fn from_wbgt(wbgt: f64) -> Self {
        if wbgt >= 31.0 {
            HeatLevel::Danger
        } else if wbgt >= 28.0 {
            HeatLevel::Severe
        } else if wbgt >= 25.0 {
            HeatLevel::Warning
        } else if wbgt >= 21.0 {
            HeatLevel::Caution
        } else {
            HeatLevel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeatLevel::Safe => "safe",
            HeatLevel::Caution => "caution",
            HeatLevel::Warning => "warning",
            HeatLevel::Severe => "severe",
            HeatLevel::Danger => "danger",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "safe" => Some(HeatLevel::Safe),
            "caution" => Some(HeatLevel::Caution),
            "warning" => Some(HeatLevel::Warning),
            "severe" => Some(HeatLevel::Severe),
            "danger" => Some(HeatLevel::Danger),
            _ => None,
        }
    }

    /// Japanese label used in call scripts and messages.
    pub fn label_ja(&self) -> &'static str {
        match self {
            HeatLevel::Safe => "ほぼ安全",
            HeatLevel::Caution => "注意",
            HeatLevel::Warning => "警戒",
            HeatLevel::Severe => "厳重警戒",
            HeatLevel::Danger => "危険",
        }
    }
}

impl Display for HeatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_inclusive_on_the_lower_edge() {
        assert_eq!(HeatLevel::from_wbgt(20.9), HeatLevel::Safe);
        assert_eq!(HeatLevel::from_wbgt(21.0), HeatLevel::Caution);
        assert_eq!(HeatLevel::from_wbgt(25.0), HeatLevel::Warning);
        assert_eq!(HeatLevel::from_wbgt(27.99), HeatLevel::Warning);
        assert_eq!(HeatLevel::from_wbgt(28.0), HeatLevel::Severe);
        assert_eq!(HeatLevel::from_wbgt(31.0), HeatLevel::Danger);
        assert_eq!(HeatLevel::from_wbgt(35.4), HeatLevel::Danger);
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(HeatLevel::Danger > HeatLevel::Severe);
        assert!(HeatLevel::Caution > HeatLevel::Safe);
    }
}
