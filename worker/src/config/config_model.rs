use backend::config::config_model::{Callbacks, Database, Escalation};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub callbacks: Callbacks,
    pub escalation: Escalation,
    pub notify: Notify,
    pub scheduler: Scheduler,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Live,
    Stub,
}

#[derive(Debug, Clone)]
pub struct Twilio {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct Notify {
    pub mode: NotifyMode,
    /// Only loaded in live mode.
    pub twilio: Option<Twilio>,
    pub line_channel_access_token: Option<String>,
    pub staff_alert_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    pub tick_secs: u64,
    pub batch_size: i64,
    /// How long a claimed alert stays hidden from other workers.
    pub lease_secs: i64,
}
