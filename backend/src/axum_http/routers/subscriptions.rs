use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            app_users::AppUserRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            plans::FREE_PLAN_ID,
            subscriptions::{CreateCheckoutRequest, CreateCheckoutResponse},
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            app_users::AppUserPostgres, plans::PlanPostgres, subscriptions::SubscriptionPostgres,
        },
    },
    payments::stripe_client::{StripeClient, StripeGateway},
};
use tracing::warn;

use crate::{
    axum_http::{auth::AuthUser, error_responses::ErrorResponse},
    config::config_model::Stripe as StripeConfig,
    usecases::subscriptions::SubscriptionUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe: StripeConfig) -> Router {
    let stripe_client = StripeClient::new(
        stripe.secret_key,
        stripe.webhook_secret,
        stripe.success_url,
        stripe.cancel_url,
    );
    let subscriptions_usecase = SubscriptionUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(AppUserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(stripe_client),
        FREE_PLAN_ID,
    );

    Router::new()
        .route(
            "/plans",
            get(list_plans::<PlanPostgres, SubscriptionPostgres, AppUserPostgres, StripeClient>),
        )
        .route(
            "/current",
            get(current_subscription::<PlanPostgres, SubscriptionPostgres, AppUserPostgres, StripeClient>),
        )
        .route(
            "/checkout",
            post(create_checkout::<PlanPostgres, SubscriptionPostgres, AppUserPostgres, StripeClient>),
        )
        .route(
            "/cancel",
            post(cancel_subscription::<PlanPostgres, SubscriptionPostgres, AppUserPostgres, StripeClient>),
        )
        .route(
            "/webhook",
            post(stripe_webhook::<PlanPostgres, SubscriptionPostgres, AppUserPostgres, StripeClient>),
        )
        .with_state(Arc::new(subscriptions_usecase))
}

pub async fn list_plans<P, S, U, G>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, U, G>>>,
    _auth: AuthUser,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.list_plans().await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn current_subscription<P, S, U, G>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, U, G>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.get_current_subscription(auth.user_id).await {
        Ok(current) => (StatusCode::OK, Json(current)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_checkout<P, S, U, G>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, U, G>>>,
    auth: AuthUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase
        .create_checkout_session(auth.user_id, auth.email, request.plan_id)
        .await
    {
        Ok(checkout_url) => {
            (StatusCode::OK, Json(CreateCheckoutResponse { checkout_url })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_subscription<P, S, U, G>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, U, G>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.cancel_recurring_subscription(auth.user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Stripe authenticates with `Stripe-Signature`, not a bearer token.
pub async fn stripe_webhook<P, S, U, G>(
    State(usecase): State<Arc<SubscriptionUseCase<P, S, U, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        warn!("subscriptions router: stripe webhook without signature header");
        return ErrorResponse::new(StatusCode::BAD_REQUEST, "missing Stripe-Signature header");
    };

    match usecase.handle_stripe_webhook(&body, signature).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
