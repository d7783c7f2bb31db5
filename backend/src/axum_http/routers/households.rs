use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use crates::{
    domain::{
        repositories::{
            app_users::AppUserRepository, contacts::ContactRepository,
            households::HouseholdRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            contacts::{CreateContactModel, UpdateContactModel},
            households::{CreateHouseholdModel, UpdateHouseholdModel},
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            app_users::AppUserPostgres, contacts::ContactPostgres, households::HouseholdPostgres,
            plans::PlanPostgres, subscriptions::SubscriptionPostgres,
        },
    },
};
use uuid::Uuid;

use crate::{
    axum_http::auth::AuthUser,
    usecases::{contacts::ContactUseCase, households::HouseholdUseCase},
};

type Households =
    HouseholdUseCase<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>;
type Contacts =
    ContactUseCase<HouseholdPostgres, ContactPostgres, PlanPostgres, SubscriptionPostgres>;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let household_repository = Arc::new(HouseholdPostgres::new(Arc::clone(&db_pool)));
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));

    let households_usecase: Households = HouseholdUseCase::new(
        Arc::clone(&household_repository),
        Arc::new(AppUserPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&plan_repository),
        Arc::clone(&subscription_repository),
    );
    let contacts_usecase: Contacts = ContactUseCase::new(
        household_repository,
        Arc::new(ContactPostgres::new(Arc::clone(&db_pool))),
        plan_repository,
        subscription_repository,
    );

    let households = Router::new()
        .route(
            "/",
            get(list_households::<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>)
                .post(create_household::<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>),
        )
        .route(
            "/:household_id",
            get(get_household::<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>)
                .patch(update_household::<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>)
                .delete(delete_household::<HouseholdPostgres, AppUserPostgres, PlanPostgres, SubscriptionPostgres>),
        )
        .with_state(Arc::new(households_usecase));

    let contacts = Router::new()
        .route(
            "/:household_id/contacts",
            get(list_contacts::<HouseholdPostgres, ContactPostgres, PlanPostgres, SubscriptionPostgres>)
                .post(add_contact::<HouseholdPostgres, ContactPostgres, PlanPostgres, SubscriptionPostgres>),
        )
        .route(
            "/:household_id/contacts/:contact_id",
            patch(update_contact::<HouseholdPostgres, ContactPostgres, PlanPostgres, SubscriptionPostgres>)
                .delete(delete_contact::<HouseholdPostgres, ContactPostgres, PlanPostgres, SubscriptionPostgres>),
        )
        .with_state(Arc::new(contacts_usecase));

    households.merge(contacts)
}

pub async fn list_households<H, U, P, S>(
    State(usecase): State<Arc<HouseholdUseCase<H, U, P, S>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.list_households(auth.user_id).await {
        Ok(households) => (StatusCode::OK, Json(households)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_household<H, U, P, S>(
    State(usecase): State<Arc<HouseholdUseCase<H, U, P, S>>>,
    auth: AuthUser,
    Json(model): Json<CreateHouseholdModel>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase
        .create_household(auth.user_id, auth.email, model)
        .await
    {
        Ok(household) => (StatusCode::CREATED, Json(household)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_household<H, U, P, S>(
    State(usecase): State<Arc<HouseholdUseCase<H, U, P, S>>>,
    auth: AuthUser,
    Path(household_id): Path<Uuid>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.get_household(auth.user_id, household_id).await {
        Ok(household) => (StatusCode::OK, Json(household)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_household<H, U, P, S>(
    State(usecase): State<Arc<HouseholdUseCase<H, U, P, S>>>,
    auth: AuthUser,
    Path(household_id): Path<Uuid>,
    Json(model): Json<UpdateHouseholdModel>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase
        .update_household(auth.user_id, household_id, model)
        .await
    {
        Ok(household) => (StatusCode::OK, Json(household)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_household<H, U, P, S>(
    State(usecase): State<Arc<HouseholdUseCase<H, U, P, S>>>,
    auth: AuthUser,
    Path(household_id): Path<Uuid>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.delete_household(auth.user_id, household_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_contacts<H, C, P, S>(
    State(usecase): State<Arc<ContactUseCase<H, C, P, S>>>,
    auth: AuthUser,
    Path(household_id): Path<Uuid>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.list_contacts(auth.user_id, household_id).await {
        Ok(contacts) => (StatusCode::OK, Json(contacts)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn add_contact<H, C, P, S>(
    State(usecase): State<Arc<ContactUseCase<H, C, P, S>>>,
    auth: AuthUser,
    Path(household_id): Path<Uuid>,
    Json(model): Json<CreateContactModel>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.add_contact(auth.user_id, household_id, model).await {
        Ok(contact) => (StatusCode::CREATED, Json(contact)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_contact<H, C, P, S>(
    State(usecase): State<Arc<ContactUseCase<H, C, P, S>>>,
    auth: AuthUser,
    Path((household_id, contact_id)): Path<(Uuid, Uuid)>,
    Json(model): Json<UpdateContactModel>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase
        .update_contact(auth.user_id, household_id, contact_id, model)
        .await
    {
        Ok(contact) => (StatusCode::OK, Json(contact)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_contact<H, C, P, S>(
    State(usecase): State<Arc<ContactUseCase<H, C, P, S>>>,
    auth: AuthUser,
    Path((household_id, contact_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse
where
    H: HouseholdRepository + Send + Sync + 'static,
    C: ContactRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase
        .delete_contact(auth.user_id, household_id, contact_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
