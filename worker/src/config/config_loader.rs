use super::config_model::{DotEnvyConfig, Notify, NotifyMode, Scheduler, Twilio, WorkerServer};
use anyhow::{Result, bail};
use backend::config::{
    config_loader::{
        get_stage, load_callbacks, load_escalation, optional, optional_parse, required,
        required_parse,
    },
    config_model::Database,
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: required_parse("SERVER_PORT_WORKER")?,
        timeout: optional_parse("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional_parse("DATABASE_MAX_CONNECTIONS", 5)?,
    };

    let scheduler = Scheduler {
        tick_secs: optional_parse("ESCALATION_TICK_SECS", 30)?,
        batch_size: optional_parse("ESCALATION_BATCH_SIZE", 50)?,
        lease_secs: optional_parse("ESCALATION_LEASE_SECS", 120)?,
    };
    if scheduler.tick_secs == 0 || scheduler.batch_size <= 0 || scheduler.lease_secs <= 0 {
        bail!(
            "ESCALATION_TICK_SECS, ESCALATION_BATCH_SIZE and ESCALATION_LEASE_SECS must be positive"
        );
    }

    Ok(DotEnvyConfig {
        worker_server,
        database,
        callbacks: load_callbacks()?,
        escalation: load_escalation()?,
        notify: load_notify(get_stage())?,
        scheduler,
    })
}

fn load_notify(stage: Stage) -> Result<Notify> {
    let mode = parse_notify_mode(optional("NOTIFY_MODE").as_deref(), stage)?;

    let twilio = match mode {
        NotifyMode::Live => Some(Twilio {
            account_sid: required("TWILIO_ACCOUNT_SID")?,
            auth_token: required("TWILIO_AUTH_TOKEN")?,
            from_number: required("TWILIO_FROM_NUMBER")?,
        }),
        NotifyMode::Stub => None,
    };

    Ok(Notify {
        mode,
        twilio,
        line_channel_access_token: optional("LINE_CHANNEL_ACCESS_TOKEN"),
        staff_alert_phone: optional("STAFF_ALERT_PHONE"),
    })
}

/// Production sends for real unless told otherwise; every other stage stubs.
pub fn parse_notify_mode(raw: Option<&str>, stage: Stage) -> Result<NotifyMode> {
    match raw.map(|value| value.trim().to_ascii_lowercase()) {
        None => Ok(match stage {
            Stage::Production => NotifyMode::Live,
            _ => NotifyMode::Stub,
        }),
        Some(value) => match value.as_str() {
            "live" | "twilio" => Ok(NotifyMode::Live),
            "stub" => Ok(NotifyMode::Stub),
            other => bail!("NOTIFY_MODE is invalid ({other})"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_mode_defaults_follow_stage() {
        assert_eq!(
            parse_notify_mode(None, Stage::Production).unwrap(),
            NotifyMode::Live
        );
        assert_eq!(parse_notify_mode(None, Stage::Local).unwrap(), NotifyMode::Stub);
    }

    #[test]
    fn explicit_notify_mode_wins() {
        assert_eq!(
            parse_notify_mode(Some("STUB"), Stage::Production).unwrap(),
            NotifyMode::Stub
        );
        assert_eq!(
            parse_notify_mode(Some("twilio"), Stage::Development).unwrap(),
            NotifyMode::Live
        );
        assert!(parse_notify_mode(Some("carrier-pigeon"), Stage::Local).is_err());
    }
}
