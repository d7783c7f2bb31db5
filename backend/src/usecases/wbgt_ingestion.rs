use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::alerts::InsertAlertEntity,
    repositories::{alerts::AlertRepository, households::HouseholdRepository},
    value_objects::{
        alerts::{AlertThresholds, IngestWbgtModel, IngestWbgtResult, WbgtReading},
        enums::{alert_statuses::AlertStatus, heat_levels::HeatLevel},
        households::is_valid_address_grid,
    },
};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::alerts::{AlertError, UseCaseResult};

pub struct WbgtIngestionUseCase<A, H>
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    alert_repo: Arc<A>,
    household_repo: Arc<H>,
    thresholds: AlertThresholds,
}

impl<A, H> WbgtIngestionUseCase<A, H>
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    pub fn new(alert_repo: Arc<A>, household_repo: Arc<H>, thresholds: AlertThresholds) -> Self {
        Self {
            alert_repo,
            household_repo,
            thresholds,
        }
    }

    /// Opens an `unanswered` alert for every household a reading puts at risk,
    /// unless the household already has an open alert.
    pub async fn ingest_wbgt(
        &self,
        user_id: Uuid,
        is_admin: bool,
        model: IngestWbgtModel,
    ) -> UseCaseResult<IngestWbgtResult> {
        if !is_admin {
            return Err(AlertError::Forbidden);
        }
        validate_readings(&model.readings)?;

        let mut result = IngestWbgtResult::default();

        for reading in &model.readings {
            let level = HeatLevel::from_wbgt(reading.wbgt);
            let households = self
                .household_repo
                .list_by_address_grid(&reading.address_grid)
                .await
                .map_err(|err| {
                    error!(
                        address_grid = %reading.address_grid,
                        db_error = ?err,
                        "wbgt_ingestion: failed to list households in grid"
                    );
                    AlertError::Internal(err)
                })?;

            for household in households {
                if !self.thresholds.should_alert(reading.wbgt, household.risk_flag) {
                    result.below_threshold += 1;
                    continue;
                }

                let open = self
                    .alert_repo
                    .find_open_alert_for_household(household.id)
                    .await
                    .map_err(|err| {
                        error!(
                            household_id = %household.id,
                            db_error = ?err,
                            "wbgt_ingestion: failed to look up open alert"
                        );
                        AlertError::Internal(err)
                    })?;
                if let Some(open) = open {
                    debug!(
                        household_id = %household.id,
                        alert_id = %open.id,
                        "wbgt_ingestion: household already has an open alert"
                    );
                    result.skipped_open_alerts += 1;
                    continue;
                }

                let now = Utc::now();
                let created = self
                    .alert_repo
                    .create_alert(InsertAlertEntity {
                        household_id: household.id,
                        status: AlertStatus::Unanswered.to_string(),
                        wbgt: reading.wbgt,
                        level: level.to_string(),
                        attempts: 0,
                        next_action_at: Some(now),
                        created_at: now,
                        updated_at: now,
                    })
                    .await
                    .map_err(|err| {
                        error!(
                            household_id = %household.id,
                            db_error = ?err,
                            "wbgt_ingestion: failed to create alert"
                        );
                        AlertError::Internal(err)
                    })?;
                let Some(alert_id) = created else {
                    debug!(
                        household_id = %household.id,
                        "wbgt_ingestion: open alert was created concurrently"
                    );
                    result.skipped_open_alerts += 1;
                    continue;
                };

                info!(
                    %alert_id,
                    household_id = %household.id,
                    wbgt = reading.wbgt,
                    level = %level,
                    "wbgt_ingestion: alert opened"
                );
                result.created_alert_ids.push(alert_id);
            }
        }

        info!(
            %user_id,
            readings = model.readings.len(),
            created = result.created_alert_ids.len(),
            skipped = result.skipped_open_alerts,
            below_threshold = result.below_threshold,
            "wbgt_ingestion: readings processed"
        );

        Ok(result)
    }
}

fn validate_readings(readings: &[WbgtReading]) -> UseCaseResult<()> {
    if readings.is_empty() {
        return Err(AlertError::Validation("readings must not be empty".to_string()));
    }
    for reading in readings {
        if !reading.wbgt.is_finite() {
            return Err(AlertError::Validation(format!(
                "wbgt for grid {} is not a number",
                reading.address_grid
            )));
        }
        if !is_valid_address_grid(&reading.address_grid) {
            return Err(AlertError::Validation(format!(
                "invalid address_grid {}",
                reading.address_grid
            )));
        }
    }
    Ok(())
}
