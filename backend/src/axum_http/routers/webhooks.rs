use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::{
    domain::{policies::escalation::EscalationPolicy, repositories::alerts::AlertRepository},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::alerts::AlertPostgres,
    },
    notifications::callback_token::CallbackSigner,
};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::usecases::responses::ResponseUseCase;

/// Query string carried by every Twilio callback URL we hand out.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub alert_id: Uuid,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwilioVoiceForm {
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TwilioStatusForm {
    #[serde(rename = "CallStatus")]
    pub call_status: String,
}

#[derive(Debug, Serialize)]
pub struct LineWebhookResponse {
    pub recorded: usize,
}

pub struct WebhookSettings {
    pub signer: CallbackSigner,
    pub public_base_url: Url,
    pub line_channel_secret: Option<String>,
    pub policy: EscalationPolicy,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, settings: WebhookSettings) -> Router {
    let responses_usecase = ResponseUseCase::new(
        Arc::new(AlertPostgres::new(Arc::clone(&db_pool))),
        settings.signer,
        settings.public_base_url,
        settings.line_channel_secret,
        settings.policy,
    );

    Router::new()
        .route(
            "/twilio/voice",
            get(twilio_voice_prompt::<AlertPostgres>).post(twilio_voice::<AlertPostgres>),
        )
        .route("/twilio/status", post(twilio_status::<AlertPostgres>))
        .route("/line", post(line_webhook::<AlertPostgres>))
        .with_state(Arc::new(responses_usecase))
}

fn twiml_response(twiml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        twiml,
    )
        .into_response()
}

pub async fn twilio_voice_prompt<A>(
    State(usecase): State<Arc<ResponseUseCase<A>>>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase
        .voice_webhook(query.alert_id, &query.token, None)
        .await
    {
        Ok(twiml) => twiml_response(twiml),
        Err(err) => err.into_response(),
    }
}

pub async fn twilio_voice<A>(
    State(usecase): State<Arc<ResponseUseCase<A>>>,
    Query(query): Query<CallbackQuery>,
    Form(form): Form<TwilioVoiceForm>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase
        .voice_webhook(query.alert_id, &query.token, form.digits.as_deref())
        .await
    {
        Ok(twiml) => twiml_response(twiml),
        Err(err) => err.into_response(),
    }
}

pub async fn twilio_status<A>(
    State(usecase): State<Arc<ResponseUseCase<A>>>,
    Query(query): Query<CallbackQuery>,
    Form(form): Form<TwilioStatusForm>,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
{
    match usecase
        .call_status(query.alert_id, &query.token, &form.call_status)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn line_webhook<A>(
    State(usecase): State<Arc<ResponseUseCase<A>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    A: AlertRepository + Send + Sync + 'static,
{
    let signature = headers
        .get("x-line-signature")
        .and_then(|value| value.to_str().ok());

    match usecase.line_webhook(&body, signature).await {
        Ok(recorded) => (StatusCode::OK, Json(LineWebhookResponse { recorded })).into_response(),
        Err(err) => err.into_response(),
    }
}
