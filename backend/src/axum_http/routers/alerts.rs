use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use crates::{
    domain::{
        repositories::{alerts::AlertRepository, households::HouseholdRepository},
        value_objects::alerts::{
            AlertListFilter, AlertThresholds, IngestWbgtModel, UpdateAlertStatusModel,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{alerts::AlertPostgres, households::HouseholdPostgres},
    },
};
use uuid::Uuid;

use crate::{
    axum_http::auth::AuthUser,
    usecases::{alerts::AlertUseCase, wbgt_ingestion::WbgtIngestionUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, thresholds: AlertThresholds) -> Router {
    let alert_repository = Arc::new(AlertPostgres::new(Arc::clone(&db_pool)));
    let household_repository = Arc::new(HouseholdPostgres::new(Arc::clone(&db_pool)));

    let alerts_usecase =
        AlertUseCase::new(Arc::clone(&alert_repository), Arc::clone(&household_repository));
    let ingestion_usecase =
        WbgtIngestionUseCase::new(alert_repository, household_repository, thresholds);

    let alerts = Router::new()
        .route("/", get(list_alerts::<AlertPostgres, HouseholdPostgres>))
        .route("/:alert_id", get(get_alert::<AlertPostgres, HouseholdPostgres>))
        .route(
            "/:alert_id/status",
            patch(update_alert_status::<AlertPostgres, HouseholdPostgres>),
        )
        .with_state(Arc::new(alerts_usecase));

    let ingestion = Router::new()
        .route("/wbgt", post(ingest_wbgt::<AlertPostgres, HouseholdPostgres>))
        .with_state(Arc::new(ingestion_usecase));

    alerts.merge(ingestion)
}

pub async fn list_alerts<A, H>(
    State(usecase): State<Arc<AlertUseCase<A, H>>>,
    auth: AuthUser,
    Query(filter): Query<AlertListFilter>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    match usecase
        .list_alerts(auth.user_id, auth.is_admin, filter)
        .await
    {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_alert<A, H>(
    State(usecase): State<Arc<AlertUseCase<A, H>>>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    match usecase.get_alert(auth.user_id, auth.is_admin, alert_id).await {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_alert_status<A, H>(
    State(usecase): State<Arc<AlertUseCase<A, H>>>,
    auth: AuthUser,
    Path(alert_id): Path<Uuid>,
    Json(model): Json<UpdateAlertStatusModel>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    match usecase
        .update_status(auth.user_id, auth.is_admin, alert_id, model)
        .await
    {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn ingest_wbgt<A, H>(
    State(usecase): State<Arc<WbgtIngestionUseCase<A, H>>>,
    auth: AuthUser,
    Json(model): Json<IngestWbgtModel>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
{
    match usecase
        .ingest_wbgt(auth.user_id, auth.is_admin, model)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => err.into_response(),
    }
}
