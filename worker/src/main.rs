use anyhow::{Context, Result};
use crates::domain::repositories::{
    alerts::AlertRepository, contacts::ContactRepository, households::HouseholdRepository,
    plans::PlanRepository, subscriptions::SubscriptionRepository,
};
use crates::infra::db::{
    postgres::postgres_connection,
    repositories::{
        alerts::AlertPostgres, contacts::ContactPostgres, households::HouseholdPostgres,
        plans::PlanPostgres, subscriptions::SubscriptionPostgres,
    },
};
use crates::notifications::{
    dispatcher::{LiveDispatcher, NotificationDispatcher},
    line::LineClient,
    stub::StubDispatcher,
    twilio::TwilioClient,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use worker::{
    axum_http,
    config::{
        self,
        config_model::{DotEnvyConfig, NotifyMode},
    },
    services::escalation_loop,
    usecases::escalation::{EscalationSettings, EscalationUseCase},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!(notify_mode = ?dotenvy_env.notify.mode, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let alert_repository: Arc<dyn AlertRepository + Send + Sync> =
        Arc::new(AlertPostgres::new(Arc::clone(&db_pool_arc)));
    let household_repository: Arc<dyn HouseholdRepository + Send + Sync> =
        Arc::new(HouseholdPostgres::new(Arc::clone(&db_pool_arc)));
    let contact_repository: Arc<dyn ContactRepository + Send + Sync> =
        Arc::new(ContactPostgres::new(Arc::clone(&db_pool_arc)));
    let plan_repository: Arc<dyn PlanRepository + Send + Sync> =
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool_arc)));
    let subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync> =
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));

    let dispatcher = build_dispatcher(&dotenvy_env)?;

    let escalation_usecase = Arc::new(EscalationUseCase::new(
        alert_repository,
        household_repository,
        contact_repository,
        plan_repository,
        subscription_repository,
        dispatcher,
        dotenvy_env.callbacks.signer(),
        dotenvy_env.callbacks.public_base_url.clone(),
        dotenvy_env.escalation.policy(),
        EscalationSettings {
            batch_size: dotenvy_env.scheduler.batch_size,
            lease: chrono::Duration::seconds(dotenvy_env.scheduler.lease_secs),
            staff_alert_phone: dotenvy_env.notify.staff_alert_phone.clone(),
        },
    ));

    let escalation_loop = tokio::spawn(escalation_loop::run(
        escalation_usecase,
        Duration::from_secs(dotenvy_env.scheduler.tick_secs),
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let health_server =
        tokio::spawn(async move { axum_http::http_serve::start(server_config).await });

    tokio::select! {
        result = escalation_loop => result??,
        result = health_server => result??,
    };
    Ok(())
}

fn build_dispatcher(
    config: &DotEnvyConfig,
) -> Result<Arc<dyn NotificationDispatcher + Send + Sync>> {
    let notify = &config.notify;

    match notify.mode {
        NotifyMode::Stub => {
            warn!("notify: stub mode, nothing will be delivered");
            Ok(Arc::new(StubDispatcher))
        }
        NotifyMode::Live => {
            let twilio = notify
                .twilio
                .as_ref()
                .context("notify: live mode needs Twilio credentials")?;
            let line = notify
                .line_channel_access_token
                .clone()
                .map(LineClient::new);
            if line.is_none() {
                warn!("notify: LINE_CHANNEL_ACCESS_TOKEN is not set, LINE pushes will fail");
            }

            Ok(Arc::new(LiveDispatcher::new(
                TwilioClient::new(
                    twilio.account_sid.clone(),
                    twilio.auth_token.clone(),
                    twilio.from_number.clone(),
                ),
                line,
            )))
        }
    }
}
