pub mod alert_event_kinds;
pub mod alert_statuses;
pub mod heat_levels;
pub mod notify_channels;
pub mod plan_codes;
pub mod subscription_statuses;
pub mod user_roles;
