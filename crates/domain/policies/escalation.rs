use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    entities::alerts::AlertEntity,
    value_objects::{enums::alert_statuses::AlertStatus, plans::PlanFeatures},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationSettings {
    /// Check-in calls placed before the household counts as unreachable.
    pub max_attempts: i32,
    /// Base spacing between check-in calls; grows with each attempt.
    pub retry_interval: Duration,
    /// Time family has to react before staff are alerted.
    pub staff_delay: Duration,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_interval: Duration::minutes(10),
            staff_delay: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStep {
    PlaceCall,
    NotifyFamily,
    AlertStaff,
}

/// What the worker should do for one alert right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationDecision {
    pub steps: Vec<EscalationStep>,
    pub transition_to: Option<AlertStatus>,
    /// `None` takes the alert out of the worker's queue.
    pub next_action_at: Option<DateTime<Utc>>,
}

impl EscalationDecision {
    fn idle(next_action_at: Option<DateTime<Utc>>) -> Self {
        Self {
            steps: Vec::new(),
            transition_to: None,
            next_action_at,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.steps.is_empty() && self.transition_to.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationPolicy {
    settings: EscalationSettings,
}

impl EscalationPolicy {
    pub fn new(settings: EscalationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EscalationSettings {
        &self.settings
    }

    /// Delay before the next check-in once `attempts` calls have been made.
    pub fn retry_delay(&self, attempts: i32) -> Duration {
        self.settings.retry_interval * attempts.max(1)
    }

    pub fn decide(
        &self,
        alert: &AlertEntity,
        now: DateTime<Utc>,
        features: &PlanFeatures,
    ) -> EscalationDecision {
        let Some(status) = alert.status() else {
            return EscalationDecision::idle(None);
        };

        if let Some(next_action_at) = alert.next_action_at {
            if next_action_at > now {
                return EscalationDecision::idle(Some(next_action_at));
            }
        }

        let staff_enabled = features.has_staff_escalation();

        match status {
            AlertStatus::Unanswered if alert.attempts < self.settings.max_attempts => {
                EscalationDecision {
                    steps: vec![EscalationStep::PlaceCall],
                    transition_to: None,
                    next_action_at: Some(now + self.retry_delay(alert.attempts + 1)),
                }
            }
            AlertStatus::Unanswered => EscalationDecision {
                steps: vec![EscalationStep::NotifyFamily],
                transition_to: Some(AlertStatus::Escalated),
                next_action_at: staff_enabled.then(|| now + self.settings.staff_delay),
            },
            AlertStatus::Tired => match alert.family_notified_at {
                None => EscalationDecision {
                    steps: vec![EscalationStep::NotifyFamily],
                    transition_to: None,
                    next_action_at: Some(now + self.settings.staff_delay),
                },
                Some(notified_at) if now - notified_at >= self.settings.staff_delay => {
                    let steps = if staff_enabled && alert.staff_notified_at.is_none() {
                        vec![EscalationStep::AlertStaff]
                    } else {
                        Vec::new()
                    };
                    EscalationDecision {
                        steps,
                        transition_to: Some(AlertStatus::Escalated),
                        next_action_at: None,
                    }
                }
                Some(notified_at) => {
                    EscalationDecision::idle(Some(notified_at + self.settings.staff_delay))
                }
            },
            AlertStatus::Help => {
                let mut steps = Vec::new();
                if alert.family_notified_at.is_none() {
                    steps.push(EscalationStep::NotifyFamily);
                }
                if staff_enabled && alert.staff_notified_at.is_none() {
                    steps.push(EscalationStep::AlertStaff);
                }
                EscalationDecision {
                    steps,
                    transition_to: Some(AlertStatus::Escalated),
                    next_action_at: None,
                }
            }
            AlertStatus::Escalated if alert.family_notified_at.is_none() => EscalationDecision {
                steps: vec![EscalationStep::NotifyFamily],
                transition_to: None,
                next_action_at: staff_enabled.then(|| now + self.settings.staff_delay),
            },
            AlertStatus::Escalated if staff_enabled && alert.staff_notified_at.is_none() => {
                let due_at = alert
                    .family_notified_at
                    .map(|notified_at| notified_at + self.settings.staff_delay)
                    .unwrap_or(now);
                if due_at <= now {
                    EscalationDecision {
                        steps: vec![EscalationStep::AlertStaff],
                        transition_to: None,
                        next_action_at: None,
                    }
                } else {
                    EscalationDecision::idle(Some(due_at))
                }
            }
            _ => EscalationDecision::idle(None),
        }
    }
}
