pub mod admin;
pub mod alerts;
pub mod contacts;
pub mod households;
pub mod plan_resolver;
pub mod reports;
pub mod responses;
pub mod subscriptions;
pub mod wbgt_ingestion;
