pub mod escalation;
