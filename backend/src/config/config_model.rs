use crates::{
    domain::{
        policies::escalation::{EscalationPolicy, EscalationSettings},
        value_objects::alerts::AlertThresholds,
    },
    notifications::callback_token::CallbackSigner,
};
use url::Url;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub stripe: Stripe,
    pub callbacks: Callbacks,
    pub line: Line,
    pub alerts: AlertSettings,
    pub escalation: Escalation,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Where Twilio calls us back, and how those URLs are signed.
#[derive(Debug, Clone)]
pub struct Callbacks {
    pub public_base_url: Url,
    pub signing_secret: String,
    pub ttl_seconds: i64,
}

impl Callbacks {
    pub fn signer(&self) -> CallbackSigner {
        CallbackSigner::new(
            self.signing_secret.clone(),
            chrono::Duration::seconds(self.ttl_seconds),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Line {
    pub channel_secret: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertSettings {
    pub wbgt_threshold: f64,
    pub risk_margin: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Escalation {
    pub max_attempts: i32,
    pub retry_interval_secs: i64,
    pub staff_delay_secs: i64,
}

impl AlertSettings {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            wbgt_threshold: self.wbgt_threshold,
            risk_margin: self.risk_margin,
        }
    }
}

impl Escalation {
    pub fn policy(&self) -> EscalationPolicy {
        EscalationPolicy::new(EscalationSettings {
            max_attempts: self.max_attempts,
            retry_interval: chrono::Duration::seconds(self.retry_interval_secs),
            staff_delay: chrono::Duration::seconds(self.staff_delay_secs),
        })
    }
}
