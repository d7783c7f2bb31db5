use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{
        repositories::{
            alerts::AlertRepository, app_users::AppUserRepository,
            households::HouseholdRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::admin::PageQuery,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            alerts::AlertPostgres, app_users::AppUserPostgres, households::HouseholdPostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
};

use crate::{axum_http::auth::AuthUser, usecases::admin::AdminUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let admin_usecase = AdminUseCase::new(
        Arc::new(AppUserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(HouseholdPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AlertPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route(
            "/users",
            get(list_users::<AppUserPostgres, SubscriptionPostgres, HouseholdPostgres, AlertPostgres>),
        )
        .route(
            "/subscriptions",
            get(list_subscriptions::<AppUserPostgres, SubscriptionPostgres, HouseholdPostgres, AlertPostgres>),
        )
        .route(
            "/stats",
            get(stats::<AppUserPostgres, SubscriptionPostgres, HouseholdPostgres, AlertPostgres>),
        )
        .with_state(Arc::new(admin_usecase))
}

pub async fn list_users<U, S, H, A>(
    State(usecase): State<Arc<AdminUseCase<U, S, H, A>>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse
where
    U: AppUserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase.list_users(auth.user_id, auth.is_admin, query).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_subscriptions<U, S, H, A>(
    State(usecase): State<Arc<AdminUseCase<U, S, H, A>>>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse
where
    U: AppUserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase
        .list_subscriptions(auth.user_id, auth.is_admin, query)
        .await
    {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn stats<U, S, H, A>(
    State(usecase): State<Arc<AdminUseCase<U, S, H, A>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    U: AppUserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    H: HouseholdRepository + Send + Sync + 'static,
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase.stats(auth.user_id, auth.is_admin).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => err.into_response(),
    }
}
