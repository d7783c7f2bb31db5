pub mod alerts;
pub mod app_users;
pub mod contacts;
pub mod households;
pub mod plans;
pub mod subscriptions;
