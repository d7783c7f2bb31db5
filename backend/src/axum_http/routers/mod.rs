pub mod admin;
pub mod alerts;
pub mod households;
pub mod reports;
pub mod subscriptions;
pub mod webhooks;
