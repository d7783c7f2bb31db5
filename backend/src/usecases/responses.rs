use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        entities::{
            alert_events::InsertAlertEventEntity,
            alerts::{AlertChangeset, AlertEntity},
        },
        policies::escalation::EscalationPolicy,
        repositories::alerts::AlertRepository,
        value_objects::{
            alerts::CallResponse,
            enums::{
                alert_event_kinds::AlertEventKind, alert_statuses::AlertStatus,
                notify_channels::NotifyChannel,
            },
        },
    },
    notifications::{
        callback_token::CallbackSigner,
        line::{self, LineWebhookBody},
        twilio::is_unanswered_call_status,
        twiml,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid or expired callback token")]
    Unauthorized,
    #[error("alert not found")]
    AlertNotFound,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResponseError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ResponseError::Unauthorized => StatusCode::UNAUTHORIZED,
            ResponseError::AlertNotFound => StatusCode::NOT_FOUND,
            ResponseError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ResponseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ResponseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Recorded(AlertStatus),
    /// The alert had already moved on; the answer is logged and dropped.
    Ignored,
}

pub struct ResponseUseCase<A>
where
    A: AlertRepository + Send + Sync + 'static,
{
    alert_repo: Arc<A>,
    signer: CallbackSigner,
    public_base_url: Url,
    line_channel_secret: Option<String>,
    policy: EscalationPolicy,
}

impl<A> ResponseUseCase<A>
where
    A: AlertRepository + Send + Sync + 'static,
{
    pub fn new(
        alert_repo: Arc<A>,
        signer: CallbackSigner,
        public_base_url: Url,
        line_channel_secret: Option<String>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            alert_repo,
            signer,
            public_base_url,
            line_channel_secret,
            policy,
        }
    }

    /// Answers a Twilio voice webhook with TwiML. Without `digits` the household
    /// hears the check-in prompt; with them the answer is recorded.
    pub async fn voice_webhook(
        &self,
        alert_id: Uuid,
        token: &str,
        digits: Option<&str>,
    ) -> UseCaseResult<String> {
        self.verify_callback(alert_id, token)?;

        let Some(digits) = digits.map(str::trim).filter(|d| !d.is_empty()) else {
            let alert = self.load_alert(alert_id).await?;
            if alert.status() != Some(AlertStatus::Unanswered) {
                debug!(%alert_id, status = %alert.status, "responses: prompt for a closed check-in");
                return Ok(twiml::say_and_hangup(twiml::CLOSED_MESSAGE));
            }
            return self.gather(alert_id, twiml::CHECK_IN_PROMPT);
        };

        let Some(response) = CallResponse::from_digit(digits) else {
            info!(%alert_id, digits, "responses: unrecognised keypad input");
            return self.gather(alert_id, twiml::RETRY_PROMPT);
        };

        match self
            .record_response(alert_id, response, NotifyChannel::Voice)
            .await?
        {
            ResponseOutcome::Recorded(_) => {
                Ok(twiml::say_and_hangup(twiml::acknowledgement(response)))
            }
            ResponseOutcome::Ignored => Ok(twiml::say_and_hangup(twiml::CLOSED_MESSAGE)),
        }
    }

    /// Twilio reports the final call status here. Unanswered calls are
    /// rescheduled; answered ones are left to the digits webhook and the policy.
    pub async fn call_status(
        &self,
        alert_id: Uuid,
        token: &str,
        call_status: &str,
    ) -> UseCaseResult<()> {
        self.verify_callback(alert_id, token)?;

        if !is_unanswered_call_status(call_status) {
            debug!(%alert_id, call_status, "responses: call status needs no action");
            return Ok(());
        }

        let alert = self.load_alert(alert_id).await?;
        if alert.status() != Some(AlertStatus::Unanswered) {
            debug!(%alert_id, status = %alert.status, call_status, "responses: late call status");
            return Ok(());
        }

        let next_action_at = Utc::now() + self.policy.retry_delay(alert.attempts);
        let changes = AlertChangeset {
            last_response_code: Some(Some(call_status.to_string())),
            next_action_at: Some(Some(next_action_at)),
            ..AlertChangeset::default()
        };
        let event = InsertAlertEventEntity::new(alert_id, AlertEventKind::Response)
            .with_channel(NotifyChannel::Voice)
            .with_detail(format!("call_status={call_status}"));

        let applied = self
            .alert_repo
            .update_alert(alert_id, AlertStatus::Unanswered, changes, Some(event))
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "responses: failed to record call status");
                ResponseError::Internal(err)
            })?;

        if applied {
            info!(
                %alert_id,
                call_status,
                attempts = alert.attempts,
                %next_action_at,
                "responses: unanswered call rescheduled"
            );
        }

        Ok(())
    }

    /// Verifies `X-Line-Signature` and records every check-in postback in the
    /// body. Returns the number of responses recorded.
    pub async fn line_webhook(&self, body: &[u8], signature: Option<&str>) -> UseCaseResult<usize> {
        let secret = self.line_channel_secret.as_deref().ok_or_else(|| {
            warn!("responses: LINE webhook received but LINE_CHANNEL_SECRET is not set");
            ResponseError::Unauthorized
        })?;
        let signature = signature.ok_or(ResponseError::Unauthorized)?;

        line::verify_signature(secret, body, signature).map_err(|err| {
            warn!(error = %err, "responses: LINE signature rejected");
            ResponseError::Unauthorized
        })?;

        let webhook: LineWebhookBody = serde_json::from_slice(body)
            .map_err(|err| ResponseError::InvalidPayload(err.to_string()))?;

        let mut recorded = 0;
        for event in webhook.events {
            if event.type_ != "postback" {
                continue;
            }
            let Some(postback) = event.postback else {
                continue;
            };
            let Some((alert_id, response)) = line::parse_postback_data(&postback.data) else {
                warn!(data = %postback.data, "responses: malformed LINE postback");
                continue;
            };

            match self
                .record_response(alert_id, response, NotifyChannel::Line)
                .await
            {
                Ok(ResponseOutcome::Recorded(_)) => recorded += 1,
                Ok(ResponseOutcome::Ignored) => {}
                Err(ResponseError::AlertNotFound) => {
                    warn!(%alert_id, "responses: LINE postback for unknown alert");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(recorded)
    }

    /// Applies a household answer to an `unanswered` alert.
    pub async fn record_response(
        &self,
        alert_id: Uuid,
        response: CallResponse,
        channel: NotifyChannel,
    ) -> UseCaseResult<ResponseOutcome> {
        let alert = self.load_alert(alert_id).await?;
        let target = response.target_status();

        let current = match alert.status() {
            Some(current) if current.can_transition_to(target) => current,
            current => {
                warn!(
                    %alert_id,
                    status = %alert.status,
                    response = response.as_str(),
                    %channel,
                    "responses: answer on an alert that moved on, ignoring"
                );
                self.append_ignored(alert_id, response, channel, current).await;
                return Ok(ResponseOutcome::Ignored);
            }
        };

        let now = Utc::now();
        let mut changes = AlertChangeset {
            status: Some(target.to_string()),
            last_response_code: Some(Some(response.as_str().to_string())),
            last_channel: Some(Some(channel.to_string())),
            ..AlertChangeset::default()
        };
        if target == AlertStatus::Ok {
            changes.resolved_at = Some(Some(now));
            changes.next_action_at = Some(None);
        } else {
            changes.next_action_at = Some(Some(now));
        }

        let event = InsertAlertEventEntity::transition(alert_id, current, target)
            .with_channel(channel)
            .with_detail(format!("response={}", response.as_str()));
        let event = InsertAlertEventEntity {
            kind: AlertEventKind::Response.to_string(),
            ..event
        };

        let applied = self
            .alert_repo
            .update_alert(alert_id, current, changes, Some(event))
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "responses: failed to record response");
                ResponseError::Internal(err)
            })?;

        if !applied {
            warn!(%alert_id, expected = %current, "responses: alert changed concurrently");
            return Ok(ResponseOutcome::Ignored);
        }

        info!(
            %alert_id,
            from = %current,
            to = %target,
            %channel,
            "responses: household answered"
        );

        Ok(ResponseOutcome::Recorded(target))
    }

    fn verify_callback(&self, alert_id: Uuid, token: &str) -> UseCaseResult<()> {
        self.signer.verify(token, alert_id).map_err(|err| {
            warn!(%alert_id, error = %err, "responses: callback token rejected");
            ResponseError::Unauthorized
        })
    }

    fn gather(&self, alert_id: Uuid, prompt: &str) -> UseCaseResult<String> {
        let action = self
            .signer
            .voice_url(&self.public_base_url, alert_id)
            .map_err(ResponseError::Internal)?;
        Ok(twiml::gather_prompt(action.as_str(), prompt))
    }

    async fn load_alert(&self, alert_id: Uuid) -> UseCaseResult<AlertEntity> {
        self.alert_repo
            .find_by_id(alert_id)
            .await
            .map_err(|err| {
                error!(%alert_id, db_error = ?err, "responses: failed to load alert");
                ResponseError::Internal(err)
            })?
            .ok_or(ResponseError::AlertNotFound)
    }

    async fn append_ignored(
        &self,
        alert_id: Uuid,
        response: CallResponse,
        channel: NotifyChannel,
        current: Option<AlertStatus>,
    ) {
        let mut event = InsertAlertEventEntity::new(alert_id, AlertEventKind::Response)
            .with_channel(channel)
            .with_detail(format!("ignored response={}", response.as_str()));
        event.from_status = current.map(|status| status.to_string());

        if let Err(err) = self.alert_repo.append_events(vec![event]).await {
            error!(%alert_id, db_error = ?err, "responses: failed to log ignored response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::alerts::tests::sample_alert;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use crates::domain::repositories::alerts::MockAlertRepository;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    const SECRET: &str = "callback-secret";
    const LINE_SECRET: &str = "line-secret";

    fn signer() -> CallbackSigner {
        CallbackSigner::new(SECRET, chrono::Duration::minutes(30))
    }

    fn use_case(alert_repo: MockAlertRepository) -> ResponseUseCase<MockAlertRepository> {
        ResponseUseCase::new(
            Arc::new(alert_repo),
            signer(),
            Url::parse("https://heat.example.com/").unwrap(),
            Some(LINE_SECRET.to_string()),
            EscalationPolicy::default(),
        )
    }

    fn repo_with(alert: AlertEntity) -> MockAlertRepository {
        let mut alert_repo = MockAlertRepository::new();
        alert_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(alert.clone())));
        alert_repo
    }

    fn line_signature(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(LINE_SECRET.as_bytes()).unwrap();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[tokio::test]
    async fn prompt_gathers_one_digit_with_a_signed_action() {
        let alert = sample_alert(Uuid::new_v4(), AlertStatus::Unanswered);
        let alert_id = alert.id;
        let token = signer().mint(alert_id).unwrap();

        let body = use_case(repo_with(alert))
            .voice_webhook(alert_id, &token, None)
            .await
            .unwrap();

        assert!(body.contains(r#"<Gather numDigits="1""#));
        assert!(body.contains("https://heat.example.com/api/v1/webhooks/twilio/voice"));
        assert!(body.contains(&alert_id.to_string()));
    }

    #[tokio::test]
    async fn digit_two_marks_the_household_tired() {
        let alert = sample_alert(Uuid::new_v4(), AlertStatus::Unanswered);
        let alert_id = alert.id;
        let token = signer().mint(alert_id).unwrap();

        let mut alert_repo = repo_with(alert);
        alert_repo
            .expect_update_alert()
            .withf(|_, expected, changes, event| {
                *expected == AlertStatus::Unanswered
                    && changes.status.as_deref() == Some("tired")
                    && changes.last_response_code == Some(Some("tired".to_string()))
                    && changes.last_channel == Some(Some("voice".to_string()))
                    && matches!(changes.next_action_at, Some(Some(_)))
                    && event.as_ref().is_some_and(|e| e.kind == "response")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let body = use_case(alert_repo)
            .voice_webhook(alert_id, &token, Some("2"))
            .await
            .unwrap();

        assert!(body.contains(twiml::acknowledgement(CallResponse::Tired)));
        assert!(body.contains("<Hangup/>"));
    }

    #[tokio::test]
    async fn unknown_digit_prompts_again() {
        let alert_id = Uuid::new_v4();
        let token = signer().mint(alert_id).unwrap();
        let mut alert_repo = MockAlertRepository::new();
        alert_repo.expect_update_alert().never();

        let body = use_case(alert_repo)
            .voice_webhook(alert_id, &token, Some("9"))
            .await
            .unwrap();

        assert!(body.contains("<Gather"));
    }

    #[tokio::test]
    async fn token_for_another_alert_is_unauthorized() {
        let token = signer().mint(Uuid::new_v4()).unwrap();

        let err = use_case(MockAlertRepository::new())
            .voice_webhook(Uuid::new_v4(), &token, Some("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResponseError::Unauthorized));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn answer_on_completed_alert_is_acknowledged_and_ignored() {
        let alert = sample_alert(Uuid::new_v4(), AlertStatus::Completed);
        let alert_id = alert.id;

        let mut alert_repo = repo_with(alert);
        alert_repo.expect_update_alert().never();
        alert_repo
            .expect_append_events()
            .withf(|events| events.len() == 1 && events[0].kind == "response")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = use_case(alert_repo)
            .record_response(alert_id, CallResponse::Ok, NotifyChannel::Voice)
            .await
            .unwrap();

        assert_eq!(outcome, ResponseOutcome::Ignored);
    }

    #[tokio::test]
    async fn ok_resolves_and_leaves_the_queue() {
        let alert = sample_alert(Uuid::new_v4(), AlertStatus::Unanswered);
        let alert_id = alert.id;

        let mut alert_repo = repo_with(alert);
        alert_repo
            .expect_update_alert()
            .withf(|_, _, changes, _| {
                changes.status.as_deref() == Some("ok")
                    && changes.next_action_at == Some(None)
                    && matches!(changes.resolved_at, Some(Some(_)))
            })
            .returning(|_, _, _, _| Ok(true));

        let outcome = use_case(alert_repo)
            .record_response(alert_id, CallResponse::Ok, NotifyChannel::Line)
            .await
            .unwrap();

        assert_eq!(outcome, ResponseOutcome::Recorded(AlertStatus::Ok));
    }

    #[tokio::test]
    async fn no_answer_reschedules_the_next_call() {
        let mut alert = sample_alert(Uuid::new_v4(), AlertStatus::Unanswered);
        alert.attempts = 2;
        let alert_id = alert.id;
        let token = signer().mint(alert_id).unwrap();
        let earliest = Utc::now() + chrono::Duration::minutes(20);

        let mut alert_repo = repo_with(alert);
        alert_repo
            .expect_update_alert()
            .withf(move |_, expected, changes, _| {
                *expected == AlertStatus::Unanswered
                    && changes.status.is_none()
                    && changes.last_response_code == Some(Some("no-answer".to_string()))
                    && matches!(changes.next_action_at, Some(Some(at)) if at >= earliest)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        use_case(alert_repo)
            .call_status(alert_id, &token, "no-answer")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn completed_call_status_is_left_to_the_policy() {
        let alert_id = Uuid::new_v4();
        let token = signer().mint(alert_id).unwrap();
        let mut alert_repo = MockAlertRepository::new();
        alert_repo.expect_find_by_id().never();

        use_case(alert_repo)
            .call_status(alert_id, &token, "completed")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn line_postback_records_help() {
        let alert = sample_alert(Uuid::new_v4(), AlertStatus::Unanswered);
        let alert_id = alert.id;
        let body = serde_json::to_vec(&serde_json::json!({
            "destination": "U0",
            "events": [
                { "type": "message", "message": { "type": "text", "text": "hi" } },
                {
                    "type": "postback",
                    "postback": { "data": format!("alert_id={alert_id}&response=help") },
                    "source": { "type": "user", "userId": "U123" }
                }
            ]
        }))
        .unwrap();

        let mut alert_repo = repo_with(alert);
        alert_repo
            .expect_update_alert()
            .withf(|_, _, changes, _| {
                changes.status.as_deref() == Some("help")
                    && changes.last_channel == Some(Some("line".to_string()))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let recorded = use_case(alert_repo)
            .line_webhook(&body, Some(&line_signature(&body)))
            .await
            .unwrap();

        assert_eq!(recorded, 1);
    }

    #[tokio::test]
    async fn line_webhook_with_bad_signature_is_rejected() {
        let err = use_case(MockAlertRepository::new())
            .line_webhook(br#"{"events":[]}"#, Some("bm9wZQ=="))
            .await
            .unwrap_err();

        assert!(matches!(err, ResponseError::Unauthorized));
    }
}
