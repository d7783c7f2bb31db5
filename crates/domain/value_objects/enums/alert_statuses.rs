use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a heat alert.
///
/// A household check-in starts `Unanswered`; the household answers `Ok`, `Tired`
/// or `Help`, and anything that is not resolved moves on to `Escalated`. Operators
/// then pick the alert up (`InProgress`) and close it (`Completed`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Ok,
    Unanswered,
    Tired,
    Help,
    Escalated,
    InProgress,
    Completed,
}

impl AlertStatus {
    /// Statuses the escalation worker and the response webhooks still act on.
    pub const OPEN: [AlertStatus; 5] = [
        AlertStatus::Unanswered,
        AlertStatus::Tired,
        AlertStatus::Help,
        AlertStatus::Escalated,
        AlertStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Ok => "ok",
            AlertStatus::Unanswered => "unanswered",
            AlertStatus::Tired => "tired",
            AlertStatus::Help => "help",
            AlertStatus::Escalated => "escalated",
            AlertStatus::InProgress => "in_progress",
            AlertStatus::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(AlertStatus::Ok),
            "unanswered" => Some(AlertStatus::Unanswered),
            "tired" => Some(AlertStatus::Tired),
            "help" => Some(AlertStatus::Help),
            "escalated" => Some(AlertStatus::Escalated),
            "in_progress" => Some(AlertStatus::InProgress),
            "completed" => Some(AlertStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Ok | AlertStatus::Completed)
    }

    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        use AlertStatus::*;

        matches!(
            (self, next),
            (Unanswered, Ok | Tired | Help | Escalated)
                | (Tired, Escalated | InProgress | Completed)
                | (Help, Escalated | InProgress)
                | (Escalated, InProgress | Completed)
                | (InProgress, Completed)
        )
    }
}

impl Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AlertStatus; 7] = [
        AlertStatus::Ok,
        AlertStatus::Unanswered,
        AlertStatus::Tired,
        AlertStatus::Help,
        AlertStatus::Escalated,
        AlertStatus::InProgress,
        AlertStatus::Completed,
    ];

    #[test]
    fn unanswered_moves_to_household_responses_or_escalation() {
        let from = AlertStatus::Unanswered;
        assert!(from.can_transition_to(AlertStatus::Ok));
        assert!(from.can_transition_to(AlertStatus::Tired));
        assert!(from.can_transition_to(AlertStatus::Help));
        assert!(from.can_transition_to(AlertStatus::Escalated));
        assert!(!from.can_transition_to(AlertStatus::Completed));
        assert!(!from.can_transition_to(AlertStatus::InProgress));
    }

    #[test]
    fn terminal_statuses_have_no_exit() {
        for next in ALL {
            assert!(!AlertStatus::Ok.can_transition_to(next));
            assert!(!AlertStatus::Completed.can_transition_to(next));
        }
    }

    #[test]
    fn help_cannot_be_closed_without_an_operator() {
        assert!(!AlertStatus::Help.can_transition_to(AlertStatus::Completed));
        assert!(AlertStatus::Help.can_transition_to(AlertStatus::InProgress));
    }

    #[test]
    fn escalation_is_never_reversed() {
        for back in [AlertStatus::Unanswered, AlertStatus::Tired, AlertStatus::Help] {
            assert!(!AlertStatus::Escalated.can_transition_to(back));
        }
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn string_form_matches_storage_values() {
        for status in ALL {
            assert_eq!(AlertStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(AlertStatus::from_str("snoozed"), None);
        assert_eq!(AlertStatus::InProgress.to_string(), "in_progress");
    }
}
