use std::str::FromStr;

use anyhow::{Context, Result};
use url::Url;

use super::{
    config_model::{
        AlertSettings, BackendServer, Callbacks, Database, DotEnvyConfig, Escalation, Line, Stripe,
        Supabase,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required_parse("SERVER_PORT_BACKEND")?,
        body_limit: required_parse("SERVER_BODY_LIMIT")?,
        timeout: required_parse("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional_parse("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        success_url: required("STRIPE_SUCCESS_URL")?,
        cancel_url: required("STRIPE_CANCEL_URL")?,
    };

    let line = Line {
        channel_secret: optional("LINE_CHANNEL_SECRET"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        stripe,
        callbacks: load_callbacks()?,
        line,
        alerts: load_alert_settings()?,
        escalation: load_escalation()?,
    })
}

pub fn load_callbacks() -> Result<Callbacks> {
    let public_base_url = required("PUBLIC_BASE_URL")?;

    Ok(Callbacks {
        public_base_url: Url::parse(&public_base_url)
            .with_context(|| format!("PUBLIC_BASE_URL is not a valid url: {public_base_url}"))?,
        signing_secret: required("CALLBACK_SIGNING_SECRET")?,
        ttl_seconds: optional_parse("CALLBACK_TOKEN_TTL_SECS", 3600)?,
    })
}

pub fn load_alert_settings() -> Result<AlertSettings> {
    Ok(AlertSettings {
        wbgt_threshold: optional_parse("ALERT_WBGT_THRESHOLD", 28.0)?,
        risk_margin: optional_parse("ALERT_RISK_MARGIN", 3.0)?,
    })
}

pub fn load_escalation() -> Result<Escalation> {
    Ok(Escalation {
        max_attempts: optional_parse("ESCALATION_MAX_ATTEMPTS", 3)?,
        retry_interval_secs: optional_parse("ESCALATION_RETRY_INTERVAL_SECS", 600)?,
        staff_delay_secs: optional_parse("ESCALATION_STAFF_DELAY_SECS", 900)?,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_supabase_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();

    required("SUPABASE_JWT_SECRET")
}

pub fn required(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("{key} is missing"))
}

pub fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn required_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(key)?;
    parse_value(key, &raw)
}

pub fn optional_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| anyhow::anyhow!("{key} is invalid ({raw}): {err}"))
}
