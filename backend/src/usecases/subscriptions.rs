use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use crates::{
    domain::{
        repositories::{
            app_users::AppUserRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{CurrentSubscriptionDto, PlanDto},
        },
    },
    payments::stripe_client::{StripeClient, StripeEvent, StripeGateway, StripeSubscription},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("plan not found")]
    PlanNotFound,
    #[error("missing or inactive plan price: {0}")]
    MissingPrice(&'static str),
    #[error("invalid checkout request: {0}")]
    InvalidCheckout(String),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("no active subscription to cancel")]
    SubscriptionNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::PlanNotFound | SubscriptionError::SubscriptionNotFound => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::MissingPrice(_)
            | SubscriptionError::InvalidCheckout(_)
            | SubscriptionError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<P, S, U, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    app_user_repo: Arc<U>,
    stripe_client: Arc<G>,
    free_plan_id: Uuid,
}

impl<P, S, U, G> SubscriptionUseCase<P, S, U, G>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: AppUserRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        app_user_repo: Arc<U>,
        stripe_client: Arc<G>,
        free_plan_id: Uuid,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            app_user_repo,
            stripe_client,
            free_plan_id,
        }
    }

    pub async fn list_plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self
            .plan_repo
            .list_active_plans()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: failed to list active plans");
                SubscriptionError::Internal(err)
            })?;
        let plan_count = plans.len();
        info!(plan_count, "subscriptions: active plans loaded");
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn get_current_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<CurrentSubscriptionDto>> {
        let subscription = match self
            .subscription_repo
            .find_current_active_non_free_subscription(user_id, self.free_plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to load current subscription"
                );
                SubscriptionError::Internal(err)
            })?
        {
            Some(sub) => sub,
            None => {
                debug!(%user_id, "subscriptions: no active subscription");
                return Ok(None);
            }
        };

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    plan_id = %subscription.plan_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscribed plan"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::PlanNotFound)?;

        Ok(Some(CurrentSubscriptionDto {
            plan_id: plan.id,
            plan_code: plan.code,
            plan_name: plan.name,
            status: SubscriptionStatus::from_str(&subscription.status),
            starts_at: subscription.starts_at,
            ends_at: subscription.ends_at,
            cancel_at_period_end: subscription.cancel_at_period_end,
            features: plan.features,
        }))
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        plan_id: Uuid,
    ) -> UseCaseResult<String> {
        info!(%user_id, %plan_id, "subscriptions: create checkout session requested");

        if plan_id == self.free_plan_id {
            let err = SubscriptionError::InvalidCheckout(
                "free plan does not require checkout".to_string(),
            );
            warn!(
                %user_id,
                %plan_id,
                status = err.status_code().as_u16(),
                "subscriptions: free plan checkout attempted"
            );
            return Err(err);
        }

        let plan = self
            .plan_repo
            .find_active_plan_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "subscriptions: failed to load plan for checkout"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::PlanNotFound)?;

        let price_id = plan.stripe_price_recurring.clone().ok_or_else(|| {
            let err = SubscriptionError::MissingPrice("stripe_price_recurring");
            warn!(
                %plan_id,
                status = err.status_code().as_u16(),
                "subscriptions: missing recurring price"
            );
            err
        })?;

        // Subscription rows reference app_users, so the caller must exist before the webhook lands.
        self.app_user_repo
            .upsert(user_id, user_email.clone())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to upsert app user");
                SubscriptionError::Internal(err)
            })?;

        let metadata = HashMap::from([
            ("user_id".to_string(), user_id.to_string()),
            ("plan_id".to_string(), plan_id.to_string()),
        ]);

        let checkout_url = self
            .stripe_client
            .create_checkout_session(&price_id, user_email, metadata)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    price_id = %price_id,
                    error = ?err,
                    "subscriptions: stripe checkout session creation failed"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(%user_id, %plan_id, "subscriptions: checkout session created");

        Ok(checkout_url)
    }

    pub async fn cancel_recurring_subscription(&self, user_id: Uuid) -> UseCaseResult<()> {
        let subscription = self
            .subscription_repo
            .find_current_active_non_free_subscription(user_id, self.free_plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to load current subscription for cancel"
                );
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = SubscriptionError::SubscriptionNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: no active subscription to cancel"
                );
                err
            })?;

        let provider_subscription_id =
            subscription.provider_subscription_id.clone().ok_or_else(|| {
                let err = SubscriptionError::SubscriptionNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "subscriptions: subscription missing provider id"
                );
                err
            })?;

        self.stripe_client
            .cancel_subscription(&provider_subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    error = ?err,
                    "subscriptions: stripe cancel subscription failed"
                );
                SubscriptionError::Internal(err)
            })?;

        self.subscription_repo
            .cancel_recurring_subscription(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to mark subscription canceled"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            %user_id,
            %provider_subscription_id,
            "subscriptions: cancellation scheduled for period end"
        );

        Ok(())
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<()> {
        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "subscriptions: stripe webhook verification failed");
                SubscriptionError::InvalidWebhook("signature verification failed".into())
            })?;

        info!(event_type = %event.type_, event_id = ?event.id, "subscriptions: stripe webhook verified");

        match event.type_.as_str() {
            "checkout.session.completed" => self.handle_checkout_completed(&event).await,
            "customer.subscription.deleted" => {
                let subscription_id = StripeClient::extract_subscription(&event)
                    .and_then(|subscription| subscription.id)
                    .ok_or_else(|| {
                        SubscriptionError::InvalidWebhook("missing subscription id".to_string())
                    })?;
                self.update_provider_status(&subscription_id, SubscriptionStatus::Expired)
                    .await
            }
            "invoice.payment_failed" => {
                self.handle_invoice_status_change(&event, SubscriptionStatus::PastDue)
                    .await
            }
            "invoice.payment_succeeded" => self.handle_invoice_paid(&event).await,
            "customer.subscription.updated" => {
                let subscription = StripeClient::extract_subscription(&event).ok_or_else(|| {
                    SubscriptionError::InvalidWebhook("invalid subscription payload".into())
                })?;
                let subscription_id = subscription.id.clone().ok_or_else(|| {
                    SubscriptionError::InvalidWebhook("missing subscription id".to_string())
                })?;
                let status = subscription
                    .status
                    .as_deref()
                    .map(status_from_stripe)
                    .unwrap_or(SubscriptionStatus::Active);
                self.refresh_period(&subscription_id, &subscription, status)
                    .await
            }
            other => {
                debug!(event_type = other, "subscriptions: ignoring stripe event");
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let session = StripeClient::extract_checkout_session(event).ok_or_else(|| {
            SubscriptionError::InvalidWebhook("missing checkout session".to_string())
        })?;

        if session.mode.as_deref() != Some("subscription") {
            warn!(mode = ?session.mode, "subscriptions: ignoring non-subscription checkout");
            return Ok(());
        }

        let metadata = session.metadata.clone().unwrap_or_default();
        let user_id = metadata
            .get("user_id")
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| SubscriptionError::InvalidWebhook("missing user_id".to_string()))?;
        let plan_id = metadata
            .get("plan_id")
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| SubscriptionError::InvalidWebhook("missing plan_id".to_string()))?;

        if plan_id == self.free_plan_id {
            let err =
                SubscriptionError::InvalidWebhook("free plan cannot be purchased".to_string());
            warn!(%user_id, %plan_id, "subscriptions: free plan in checkout webhook");
            return Err(err);
        }

        let subscription_id = session.subscription.clone().ok_or_else(|| {
            SubscriptionError::InvalidWebhook("subscription id missing on session".to_string())
        })?;

        let subscription = self
            .stripe_client
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    %subscription_id,
                    error = ?err,
                    "subscriptions: failed to retrieve subscription from stripe"
                );
                SubscriptionError::Internal(err)
            })?;

        let (starts_at, ends_at) = period_bounds(&subscription)?;

        self.subscription_repo
            .create_or_update_subscription_after_checkout(
                user_id,
                plan_id,
                starts_at,
                ends_at,
                SubscriptionStatus::Active,
                subscription_id.clone(),
            )
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    %subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to upsert subscription after checkout"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            %user_id,
            %plan_id,
            %subscription_id,
            %ends_at,
            "subscriptions: processed subscription checkout webhook"
        );

        Ok(())
    }

    async fn handle_invoice_status_change(
        &self,
        event: &StripeEvent,
        status: SubscriptionStatus,
    ) -> UseCaseResult<()> {
        let invoice = StripeClient::extract_invoice(event)
            .ok_or_else(|| SubscriptionError::InvalidWebhook("invalid invoice payload".into()))?;

        // One-off invoices carry no subscription and have nothing to update.
        let Some(subscription_id) = invoice.subscription else {
            debug!(invoice_id = ?invoice.id, "subscriptions: invoice without subscription");
            return Ok(());
        };

        self.update_provider_status(&subscription_id, status).await
    }

    /// A paid renewal moves `ends_at` forward; without it the plan lapses to
    /// free once the first period is over.
    async fn handle_invoice_paid(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let invoice = StripeClient::extract_invoice(event)
            .ok_or_else(|| SubscriptionError::InvalidWebhook("invalid invoice payload".into()))?;

        let Some(subscription_id) = invoice.subscription else {
            debug!(invoice_id = ?invoice.id, "subscriptions: invoice without subscription");
            return Ok(());
        };

        let subscription = self
            .stripe_client
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    error = ?err,
                    "subscriptions: failed to retrieve renewed subscription from stripe"
                );
                SubscriptionError::Internal(err)
            })?;

        self.refresh_period(&subscription_id, &subscription, SubscriptionStatus::Active)
            .await
    }

    async fn refresh_period(
        &self,
        subscription_id: &str,
        subscription: &StripeSubscription,
        status: SubscriptionStatus,
    ) -> UseCaseResult<()> {
        let (starts_at, ends_at) = period_bounds(subscription)?;

        self.subscription_repo
            .update_period_by_provider_subscription_id(subscription_id, starts_at, ends_at, status)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to refresh subscription period"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            subscription_id,
            status = %status,
            %ends_at,
            "subscriptions: subscription period refreshed"
        );

        Ok(())
    }

    async fn update_provider_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> UseCaseResult<()> {
        info!(subscription_id, status = %status, "subscriptions: updating status from webhook");

        self.subscription_repo
            .update_status_by_provider_subscription_id(subscription_id, status)
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to update subscription status from webhook"
                );
                SubscriptionError::Internal(err)
            })
    }
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

fn period_bounds(
    subscription: &StripeSubscription,
) -> UseCaseResult<(DateTime<Utc>, DateTime<Utc>)> {
    let starts_at = subscription
        .period_start()
        .and_then(ts_to_datetime)
        .ok_or_else(|| {
            SubscriptionError::InvalidWebhook("period start missing on subscription".into())
        })?;
    let ends_at = subscription
        .period_end()
        .and_then(ts_to_datetime)
        .ok_or_else(|| {
            SubscriptionError::InvalidWebhook("period end missing on subscription".into())
        })?;

    Ok((starts_at, ends_at))
}

fn status_from_stripe(status: &str) -> SubscriptionStatus {
    match status {
        "active" | "trialing" => SubscriptionStatus::Active,
        "past_due" | "unpaid" => SubscriptionStatus::PastDue,
        "incomplete" => SubscriptionStatus::Pending,
        _ => SubscriptionStatus::Expired,
    }
}
