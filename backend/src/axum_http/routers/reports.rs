use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{
        repositories::{
            alerts::AlertRepository, plans::PlanRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::reports::AlertReportQuery,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            alerts::AlertPostgres, plans::PlanPostgres, subscriptions::SubscriptionPostgres,
        },
    },
};

use crate::{
    axum_http::auth::AuthUser,
    usecases::reports::{AlertReport, ReportUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let reports_usecase = ReportUseCase::new(
        Arc::new(AlertPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route(
            "/alerts",
            get(alert_report::<AlertPostgres, PlanPostgres, SubscriptionPostgres>),
        )
        .with_state(Arc::new(reports_usecase))
}

pub async fn alert_report<A, P, S>(
    State(usecase): State<Arc<ReportUseCase<A, P, S>>>,
    auth: AuthUser,
    Query(query): Query<AlertReportQuery>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase
        .alert_report(auth.user_id, auth.is_admin, query)
        .await
    {
        Ok(AlertReport::Csv(body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"alerts.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Ok(AlertReport::Json(rows)) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => err.into_response(),
    }
}
