use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use crates::domain::{
    repositories::{
        alerts::AlertRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
    },
    value_objects::{
        plans::FREE_PLAN_ID,
        reports::{AlertReportQuery, AlertReportRow, ReportFormat},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::plan_resolver::PlanResolver;

const DEFAULT_RANGE_DAYS: i64 = 30;

/// Column order of the CSV export; matches the field order of `AlertReportRow`.
pub const REPORT_HEADERS: [&str; 10] = [
    "alert_id",
    "household_name",
    "address_grid",
    "status",
    "level",
    "wbgt",
    "attempts",
    "last_response_code",
    "created_at",
    "resolved_at",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("csv export is not included in the current plan")]
    CsvNotAllowed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReportError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ReportError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            ReportError::CsvNotAllowed => StatusCode::FORBIDDEN,
            ReportError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ReportError>;

#[derive(Debug)]
pub enum AlertReport {
    Csv(String),
    Json(Vec<AlertReportRow>),
}

pub struct ReportUseCase<A, P, S>
where
    A: AlertRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    alert_repo: Arc<A>,
    plan_resolver: PlanResolver<P, S>,
}

impl<A, P, S> ReportUseCase<A, P, S>
where
    A: AlertRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(alert_repo: Arc<A>, plan_repo: Arc<P>, subscription_repo: Arc<S>) -> Self {
        Self {
            alert_repo,
            plan_resolver: PlanResolver::new(plan_repo, subscription_repo, FREE_PLAN_ID),
        }
    }

    pub async fn alert_report(
        &self,
        user_id: Uuid,
        is_admin: bool,
        query: AlertReportQuery,
    ) -> UseCaseResult<AlertReport> {
        let to = query.to.unwrap_or_else(Utc::now);
        let from = query
            .from
            .unwrap_or_else(|| to - Duration::days(DEFAULT_RANGE_DAYS));
        if from > to {
            return Err(ReportError::InvalidRange(
                "`from` must not be after `to`".to_string(),
            ));
        }

        if query.format == ReportFormat::Csv && !is_admin {
            let plan = self
                .plan_resolver
                .resolve_effective_plan_for_user(user_id)
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "reports: failed to resolve plan");
                    ReportError::Internal(err)
                })?;
            if !plan.features.has_csv_export() {
                warn!(%user_id, plan_code = %plan.code, "reports: csv export refused by plan");
                return Err(ReportError::CsvNotAllowed);
            }
        }

        let owner_id = (!is_admin).then_some(user_id);
        let rows = self
            .alert_repo
            .list_report_rows(owner_id, from, to)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "reports: failed to load report rows");
                ReportError::Internal(err)
            })?;

        info!(
            %user_id,
            rows = rows.len(),
            %from,
            %to,
            format = ?query.format,
            "reports: alert report generated"
        );

        match query.format {
            ReportFormat::Csv => Ok(AlertReport::Csv(render_csv(&rows)?)),
            ReportFormat::Json => Ok(AlertReport::Json(rows)),
        }
    }
}

/// Renders rows with a header line, also when there are no rows.
pub fn render_csv(rows: &[AlertReportRow]) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(REPORT_HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }

    let bytes = wtr.into_inner().context("reports: failed to flush csv")?;
    String::from_utf8(bytes).context("reports: csv is not utf-8")
}
