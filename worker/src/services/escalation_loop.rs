use crate::usecases::escalation::EscalationUseCase;
use anyhow::Result;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub async fn run(usecase: Arc<EscalationUseCase>, tick: Duration) -> Result<()> {
    info!(tick_secs = tick.as_secs(), "escalation: starting worker loop");

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match usecase.run_once(Utc::now()).await {
            Ok(summary) if summary.claimed == 0 => debug!("escalation: nothing due"),
            Ok(summary) => info!(
                claimed = summary.claimed,
                processed = summary.processed,
                failed = summary.failed,
                "escalation: tick finished"
            ),
            Err(e) => error!(error = %e, "escalation: error claiming due alerts"),
        }
    }
}
