pub mod admin;
pub mod alerts;
pub mod contacts;
pub mod enums;
pub mod households;
pub mod plans;
pub mod reports;
pub mod subscriptions;
