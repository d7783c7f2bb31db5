use anyhow::Result;
use backend::usecases::plan_resolver::PlanResolver;
use chrono::{DateTime, Duration, Utc};
use crates::{
    domain::{
        entities::{
            alert_events::InsertAlertEventEntity,
            alerts::{AlertChangeset, AlertEntity},
            contacts::ContactEntity,
            households::HouseholdEntity,
        },
        policies::escalation::{EscalationPolicy, EscalationStep},
        repositories::{
            alerts::AlertRepository, contacts::ContactRepository, households::HouseholdRepository,
            plans::PlanRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::{
                alert_event_kinds::AlertEventKind, alert_statuses::AlertStatus,
                heat_levels::HeatLevel, notify_channels::NotifyChannel,
            },
            plans::{FREE_PLAN_ID, PlanFeatures},
        },
    },
    notifications::{
        callback_token::CallbackSigner, dispatcher::NotificationDispatcher, line::LineMessage,
        twiml,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

pub struct EscalationSettings {
    pub batch_size: i64,
    pub lease: Duration,
    pub staff_alert_phone: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub claimed: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Pending column updates and events for one alert during a tick.
struct Outcome {
    changes: AlertChangeset,
    events: Vec<InsertAlertEventEntity>,
}

impl Outcome {
    fn push(&mut self, event: InsertAlertEventEntity) {
        self.events.push(event);
    }
}

pub struct EscalationUseCase {
    alert_repo: Arc<dyn AlertRepository + Send + Sync>,
    household_repo: Arc<dyn HouseholdRepository + Send + Sync>,
    contact_repo: Arc<dyn ContactRepository + Send + Sync>,
    plan_resolver:
        PlanResolver<dyn PlanRepository + Send + Sync, dyn SubscriptionRepository + Send + Sync>,
    dispatcher: Arc<dyn NotificationDispatcher + Send + Sync>,
    signer: CallbackSigner,
    public_base_url: Url,
    policy: EscalationPolicy,
    settings: EscalationSettings,
}

impl EscalationUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alert_repo: Arc<dyn AlertRepository + Send + Sync>,
        household_repo: Arc<dyn HouseholdRepository + Send + Sync>,
        contact_repo: Arc<dyn ContactRepository + Send + Sync>,
        plan_repo: Arc<dyn PlanRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        dispatcher: Arc<dyn NotificationDispatcher + Send + Sync>,
        signer: CallbackSigner,
        public_base_url: Url,
        policy: EscalationPolicy,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            alert_repo,
            household_repo,
            contact_repo,
            plan_resolver: PlanResolver::new(plan_repo, subscription_repo, FREE_PLAN_ID),
            dispatcher,
            signer,
            public_base_url,
            policy,
            settings,
        }
    }

    /// Claims every due alert and advances each one. A failing alert is
    /// logged and left to its lease; the rest of the batch still runs.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let due = self
            .alert_repo
            .claim_due_alerts(now, now + self.settings.lease, self.settings.batch_size)
            .await?;

        let mut summary = TickSummary {
            claimed: due.len(),
            ..TickSummary::default()
        };

        for alert in due {
            match self.process_alert(&alert, now).await {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    summary.failed += 1;
                    error!(
                        alert_id = %alert.id,
                        error = ?err,
                        "escalation: failed to process alert"
                    );
                }
            }
        }

        Ok(summary)
    }

    pub async fn process_alert(&self, alert: &AlertEntity, now: DateTime<Utc>) -> Result<()> {
        let Some(status) = alert.status() else {
            warn!(
                alert_id = %alert.id,
                status = %alert.status,
                "escalation: unknown status, parking alert"
            );
            self.alert_repo
                .park_alert(alert.id, format!("unknown status {}", alert.status))
                .await?;
            return Ok(());
        };

        let Some(household) = self.household_repo.find_by_id(alert.household_id).await? else {
            warn!(
                alert_id = %alert.id,
                household_id = %alert.household_id,
                "escalation: household no longer exists, parking alert"
            );
            let changes = AlertChangeset {
                next_action_at: Some(None),
                last_error: Some(Some("household deleted".to_string())),
                updated_at: Some(now),
                ..AlertChangeset::default()
            };
            let event = InsertAlertEventEntity::new(alert.id, AlertEventKind::DispatchFailed)
                .with_detail("household no longer exists");
            self.alert_repo
                .update_alert(alert.id, status, changes, Some(event))
                .await?;
            return Ok(());
        };

        let plan = self
            .plan_resolver
            .resolve_effective_plan_for_user(household.user_id)
            .await?;
        let decision = self.policy.decide(alert, now, &plan.features);

        let mut outcome = Outcome {
            changes: AlertChangeset {
                next_action_at: Some(decision.next_action_at),
                updated_at: Some(now),
                ..AlertChangeset::default()
            },
            events: Vec::new(),
        };

        for step in &decision.steps {
            match step {
                EscalationStep::PlaceCall => {
                    self.place_call(alert, &household, &plan.features, now, &mut outcome)
                        .await
                }
                EscalationStep::NotifyFamily => {
                    self.notify_family(alert, status, &household, &plan.features, now, &mut outcome)
                        .await?
                }
                EscalationStep::AlertStaff => {
                    self.alert_staff(alert, status, &household, now, &mut outcome)
                        .await
                }
            }
        }

        let transition = decision.transition_to.map(|next| {
            outcome.changes.status = Some(next.to_string());
            InsertAlertEventEntity::transition(alert.id, status, next)
        });

        let applied = self
            .alert_repo
            .update_alert(alert.id, status, outcome.changes, transition)
            .await?;
        if !applied {
            warn!(
                alert_id = %alert.id,
                expected = %status,
                "escalation: alert changed during the tick, keeping the newer state"
            );
        }

        // Deliveries happened either way, so their events are kept.
        if !outcome.events.is_empty() {
            self.alert_repo.append_events(outcome.events).await?;
        }

        info!(
            alert_id = %alert.id,
            steps = ?decision.steps,
            transition = ?decision.transition_to,
            applied,
            "escalation: alert advanced"
        );

        Ok(())
    }

    async fn place_call(
        &self,
        alert: &AlertEntity,
        household: &HouseholdEntity,
        features: &PlanFeatures,
        now: DateTime<Utc>,
        outcome: &mut Outcome,
    ) {
        let line_target = household
            .line_user_id
            .as_deref()
            .filter(|_| {
                household.preferred_channel() == NotifyChannel::Line && features.has_line()
            });

        let (channel, result) = match line_target {
            Some(line_user_id) => {
                let message = LineMessage::CheckIn {
                    alert_id: alert.id,
                    text: check_in_text(alert),
                };
                (
                    NotifyChannel::Line,
                    self.dispatcher.push_line(line_user_id, &message).await,
                )
            }
            None => (NotifyChannel::Voice, self.dial_check_in(alert, household).await),
        };

        outcome.changes.attempts = Some(alert.attempts + 1);
        outcome.changes.last_call_at = Some(Some(now));
        outcome.changes.last_channel = Some(Some(channel.to_string()));

        match result {
            Ok(reference) => {
                info!(alert_id = %alert.id, %channel, %reference, "escalation: check-in sent");
                outcome.changes.last_error = Some(None);
                outcome.push(
                    InsertAlertEventEntity::new(alert.id, AlertEventKind::CallPlaced)
                        .with_channel(channel)
                        .with_detail(format!("attempt={} ref={}", alert.attempts + 1, reference)),
                );
            }
            Err(err) => {
                error!(alert_id = %alert.id, %channel, error = %err, "escalation: check-in failed");
                outcome.changes.last_error = Some(Some(err.to_string()));
                outcome.push(
                    InsertAlertEventEntity::new(alert.id, AlertEventKind::DispatchFailed)
                        .with_channel(channel)
                        .with_detail(format!("check-in: {err}")),
                );
            }
        }
    }

    async fn dial_check_in(&self, alert: &AlertEntity, household: &HouseholdEntity) -> Result<String> {
        let voice_url = self.signer.voice_url(&self.public_base_url, alert.id)?;
        let status_url = self.signer.status_url(&self.public_base_url, alert.id)?;

        self.dispatcher
            .place_call(&household.phone, voice_url.as_str(), status_url.as_str())
            .await
    }

    async fn notify_family(
        &self,
        alert: &AlertEntity,
        status: AlertStatus,
        household: &HouseholdEntity,
        features: &PlanFeatures,
        now: DateTime<Utc>,
        outcome: &mut Outcome,
    ) -> Result<()> {
        let contacts = self.contact_repo.list_by_household(household.id).await?;
        let text = family_message(alert, status, household);

        outcome.changes.family_notified_at = Some(Some(now));

        if contacts.is_empty() {
            warn!(
                alert_id = %alert.id,
                household_id = %household.id,
                "escalation: no contacts to notify"
            );
            outcome.push(
                InsertAlertEventEntity::new(alert.id, AlertEventKind::FamilyNotified)
                    .with_detail("no contacts registered"),
            );
            return Ok(());
        }

        for contact in &contacts {
            for channel in contact_channels(contact, features) {
                let result = match channel {
                    NotifyChannel::Sms => self.dispatcher.send_sms(&contact.phone, &text).await,
                    NotifyChannel::Voice => {
                        self.dispatcher
                            .announce_call(&contact.phone, &twiml::say_and_hangup(&text))
                            .await
                    }
                    NotifyChannel::Line => {
                        let to = contact.line_user_id.as_deref().unwrap_or_default();
                        self.dispatcher
                            .push_line(to, &LineMessage::Text(text.clone()))
                            .await
                    }
                };

                outcome.push(delivery_event(
                    alert.id,
                    contact.id,
                    channel,
                    result,
                    AlertEventKind::FamilyNotified,
                ));
            }
        }

        Ok(())
    }

    async fn alert_staff(
        &self,
        alert: &AlertEntity,
        status: AlertStatus,
        household: &HouseholdEntity,
        now: DateTime<Utc>,
        outcome: &mut Outcome,
    ) {
        let text = staff_message(alert, status, household);
        error!(
            alert_id = %alert.id,
            household_id = %household.id,
            %status,
            "escalation: staff attention required"
        );

        outcome.changes.staff_notified_at = Some(Some(now));

        match self.settings.staff_alert_phone.as_deref() {
            Some(phone) => {
                let result = self.dispatcher.send_sms(phone, &text).await;
                let event = match result {
                    Ok(reference) => {
                        InsertAlertEventEntity::new(alert.id, AlertEventKind::StaffNotified)
                            .with_channel(NotifyChannel::Sms)
                            .with_detail(format!("ref={reference}"))
                    }
                    Err(err) => {
                        error!(alert_id = %alert.id, error = %err, "escalation: staff sms failed");
                        InsertAlertEventEntity::new(alert.id, AlertEventKind::DispatchFailed)
                            .with_channel(NotifyChannel::Sms)
                            .with_detail(format!("staff: {err}"))
                    }
                };
                outcome.push(event);
            }
            None => outcome.push(
                InsertAlertEventEntity::new(alert.id, AlertEventKind::StaffNotified)
                    .with_detail("no staff phone configured, logged only"),
            ),
        }
    }
}

fn contact_channels(contact: &ContactEntity, features: &PlanFeatures) -> Vec<NotifyChannel> {
    let mut channels = Vec::new();
    if contact.notify_sms {
        channels.push(NotifyChannel::Sms);
    }
    if contact.notify_voice {
        channels.push(NotifyChannel::Voice);
    }
    if contact.notify_line && features.has_line() && contact.line_user_id.is_some() {
        channels.push(NotifyChannel::Line);
    }
    channels
}

fn delivery_event(
    alert_id: Uuid,
    contact_id: Uuid,
    channel: NotifyChannel,
    result: Result<String>,
    kind: AlertEventKind,
) -> InsertAlertEventEntity {
    match result {
        Ok(reference) => InsertAlertEventEntity::new(alert_id, kind)
            .with_channel(channel)
            .with_detail(format!("contact={contact_id} ref={reference}")),
        Err(err) => {
            error!(
                %alert_id,
                %contact_id,
                %channel,
                error = %err,
                "escalation: contact delivery failed"
            );
            InsertAlertEventEntity::new(alert_id, AlertEventKind::DispatchFailed)
                .with_channel(channel)
                .with_detail(format!("contact={contact_id}: {err}"))
        }
    }
}

fn heat_label(alert: &AlertEntity) -> &'static str {
    HeatLevel::from_str(&alert.level)
        .unwrap_or_else(|| HeatLevel::from_wbgt(alert.wbgt))
        .label_ja()
}

fn check_in_text(alert: &AlertEntity) -> String {
    format!(
        "熱中症見守りサービスです。現在の暑さ指数は{:.1}（{}）です。体調を教えてください。",
        alert.wbgt,
        heat_label(alert)
    )
}

fn family_message(alert: &AlertEntity, status: AlertStatus, household: &HouseholdEntity) -> String {
    let situation = match status {
        AlertStatus::Tired => "体調がすぐれないとの応答がありました",
        AlertStatus::Help => "助けが必要との応答がありました",
        _ => "安否確認の電話に応答がありません",
    };
    format!(
        "【熱中症見守り】{}さん: {}。暑さ指数{:.1}（{}）。ご確認をお願いします。",
        household.name,
        situation,
        alert.wbgt,
        heat_label(alert)
    )
}

fn staff_message(alert: &AlertEntity, status: AlertStatus, household: &HouseholdEntity) -> String {
    format!(
        "【要対応】{} ({}) status={} WBGT={:.1} alert={}",
        household.name, household.phone, status, alert.wbgt, alert.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::{
            entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
            repositories::{
                alerts::MockAlertRepository, contacts::MockContactRepository,
                households::MockHouseholdRepository, plans::MockPlanRepository,
                subscriptions::MockSubscriptionRepository,
            },
            value_objects::enums::{plan_codes::PlanCode, subscription_statuses::SubscriptionStatus},
        },
        notifications::dispatcher::MockNotificationDispatcher,
    };
    use mockall::predicate::eq;

    const STAFF_PHONE: &str = "+81300000000";

    struct Mocks {
        alerts: MockAlertRepository,
        households: MockHouseholdRepository,
        contacts: MockContactRepository,
        plans: MockPlanRepository,
        subscriptions: MockSubscriptionRepository,
        dispatcher: MockNotificationDispatcher,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                alerts: MockAlertRepository::new(),
                households: MockHouseholdRepository::new(),
                contacts: MockContactRepository::new(),
                plans: MockPlanRepository::new(),
                subscriptions: MockSubscriptionRepository::new(),
                dispatcher: MockNotificationDispatcher::new(),
            }
        }

        fn with_free_plan(mut self) -> Self {
            self.subscriptions
                .expect_find_current_active_non_free_subscription()
                .returning(|_, _| Ok(None));
            self.plans.expect_find_by_id().returning(|_| Ok(None));
            self
        }

        fn with_paid_plan(mut self, user_id: Uuid, features: PlanFeatures) -> Self {
            let plan_id = Uuid::new_v4();
            let now = Utc::now();
            let subscription = SubscriptionEntity {
                id: Uuid::new_v4(),
                user_id,
                plan_id,
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(29),
                status: SubscriptionStatus::Active.to_string(),
                cancel_at_period_end: false,
                canceled_at: None,
                provider_subscription_id: Some("sub_1".to_string()),
                created_at: now,
            };
            let plan = PlanEntity {
                id: plan_id,
                code: PlanCode::Family,
                name: Some("Family".to_string()),
                price_minor: 1980,
                duration_days: 30,
                features,
                is_active: true,
                stripe_price_recurring: None,
            };
            self.subscriptions
                .expect_find_current_active_non_free_subscription()
                .returning(move |_, _| Ok(Some(subscription.clone())));
            self.plans
                .expect_find_by_id()
                .with(eq(plan_id))
                .returning(move |_| Ok(Some(plan.clone())));
            self
        }

        fn into_usecase(self) -> EscalationUseCase {
            EscalationUseCase::new(
                Arc::new(self.alerts),
                Arc::new(self.households),
                Arc::new(self.contacts),
                Arc::new(self.plans),
                Arc::new(self.subscriptions),
                Arc::new(self.dispatcher),
                CallbackSigner::new("test-secret", Duration::hours(1)),
                Url::parse("https://watch.example.com/").unwrap(),
                EscalationPolicy::default(),
                EscalationSettings {
                    batch_size: 10,
                    lease: Duration::minutes(2),
                    staff_alert_phone: Some(STAFF_PHONE.to_string()),
                },
            )
        }
    }

    fn household(channel: NotifyChannel, line_user_id: Option<&str>) -> HouseholdEntity {
        let now = Utc::now();
        HouseholdEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "山田 花子".to_string(),
            phone: "+819011112222".to_string(),
            address_grid: "5339-45".to_string(),
            risk_flag: true,
            notes: None,
            line_user_id: line_user_id.map(str::to_string),
            preferred_channel: channel.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn alert(household_id: Uuid, status: AlertStatus, attempts: i32) -> AlertEntity {
        let now = Utc::now();
        AlertEntity {
            id: Uuid::new_v4(),
            household_id,
            status: status.to_string(),
            wbgt: 31.2,
            level: "danger".to_string(),
            attempts,
            last_call_at: None,
            last_response_code: None,
            last_channel: None,
            last_error: None,
            next_action_at: Some(now - Duration::seconds(5)),
            family_notified_at: None,
            staff_notified_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn contact(household_id: Uuid) -> ContactEntity {
        ContactEntity {
            id: Uuid::new_v4(),
            household_id,
            name: "山田 太郎".to_string(),
            phone: "+819033334444".to_string(),
            line_user_id: Some("U-family".to_string()),
            relationship: Some("son".to_string()),
            priority: 1,
            notify_voice: true,
            notify_sms: true,
            notify_line: true,
            created_at: Utc::now(),
        }
    }

    fn expect_household(mocks: &mut Mocks, household: &HouseholdEntity) {
        let found = household.clone();
        mocks
            .households
            .expect_find_by_id()
            .with(eq(household.id))
            .returning(move |_| Ok(Some(found.clone())));
    }

    #[tokio::test]
    async fn first_tick_places_a_voice_call() {
        let home = household(NotifyChannel::Voice, None);
        let due = alert(home.id, AlertStatus::Unanswered, 0);
        let mut mocks = Mocks::new().with_free_plan();
        expect_household(&mut mocks, &home);

        let claimed = due.clone();
        mocks
            .alerts
            .expect_claim_due_alerts()
            .withf(|now, lease_until, limit| *lease_until == *now + Duration::minutes(2) && *limit == 10)
            .returning(move |_, _, _| Ok(vec![claimed.clone()]));
        mocks
            .dispatcher
            .expect_place_call()
            .withf(|to, voice_url, status_url| {
                to == "+819011112222"
                    && voice_url.contains("/api/v1/webhooks/twilio/voice")
                    && status_url.contains("/api/v1/webhooks/twilio/status")
            })
            .times(1)
            .returning(|_, _, _| Ok("CA123".to_string()));
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, expected, changes, event| {
                *expected == AlertStatus::Unanswered
                    && changes.attempts == Some(1)
                    && changes.last_channel == Some(Some("voice".to_string()))
                    && changes.last_error == Some(None)
                    && changes.status.is_none()
                    && event.is_none()
            })
            .returning(|_, _, _, _| Ok(true));
        mocks
            .alerts
            .expect_append_events()
            .withf(|events| events.len() == 1 && events[0].kind == "call_placed")
            .returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        let summary = usecase.run_once(Utc::now()).await.unwrap();

        assert_eq!(
            summary,
            TickSummary {
                claimed: 1,
                processed: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn line_preference_falls_back_to_voice_without_line_plan() {
        let home = household(NotifyChannel::Line, Some("U-home"));
        let due = alert(home.id, AlertStatus::Unanswered, 1);
        let mut mocks = Mocks::new().with_free_plan();
        expect_household(&mut mocks, &home);

        mocks.dispatcher.expect_push_line().never();
        mocks
            .dispatcher
            .expect_place_call()
            .times(1)
            .returning(|_, _, _| Ok("CA124".to_string()));
        mocks
            .alerts
            .expect_update_alert()
            .returning(|_, _, _, _| Ok(true));
        mocks.alerts.expect_append_events().returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn line_plan_sends_check_in_over_line() {
        let home = household(NotifyChannel::Line, Some("U-home"));
        let due = alert(home.id, AlertStatus::Unanswered, 0);
        let features = PlanFeatures {
            line_enabled: Some(true),
            ..PlanFeatures::default()
        };
        let mut mocks = Mocks::new().with_paid_plan(home.user_id, features);
        expect_household(&mut mocks, &home);

        let alert_id = due.id;
        mocks
            .dispatcher
            .expect_push_line()
            .withf(move |to, message| {
                to == "U-home"
                    && matches!(message, LineMessage::CheckIn { alert_id: id, .. } if *id == alert_id)
            })
            .times(1)
            .returning(|_, _| Ok("line-req".to_string()));
        mocks.dispatcher.expect_place_call().never();
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, _, changes, _| changes.last_channel == Some(Some("line".to_string())))
            .returning(|_, _, _, _| Ok(true));
        mocks.alerts.expect_append_events().returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_call_counts_the_attempt_and_records_the_error() {
        let home = household(NotifyChannel::Voice, None);
        let due = alert(home.id, AlertStatus::Unanswered, 1);
        let mut mocks = Mocks::new().with_free_plan();
        expect_household(&mut mocks, &home);

        mocks
            .dispatcher
            .expect_place_call()
            .returning(|_, _, _| Err(anyhow::anyhow!("twilio: 503")));
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, _, changes, _| {
                changes.attempts == Some(2)
                    && changes.last_error == Some(Some("twilio: 503".to_string()))
            })
            .returning(|_, _, _, _| Ok(true));
        mocks
            .alerts
            .expect_append_events()
            .withf(|events| events.len() == 1 && events[0].kind == "dispatch_failed")
            .returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn exhausted_attempts_notify_family_and_escalate() {
        let home = household(NotifyChannel::Voice, None);
        let due = alert(home.id, AlertStatus::Unanswered, 3);
        let mut mocks = Mocks::new().with_free_plan();
        expect_household(&mut mocks, &home);

        let family = contact(home.id);
        mocks
            .contacts
            .expect_list_by_household()
            .with(eq(home.id))
            .returning(move |_| Ok(vec![family.clone()]));
        mocks
            .dispatcher
            .expect_send_sms()
            .withf(|to, body| to == "+819033334444" && body.contains("応答がありません"))
            .times(1)
            .returning(|_, _| Ok("SM1".to_string()));
        mocks
            .dispatcher
            .expect_announce_call()
            .withf(|to, twiml| to == "+819033334444" && twiml.contains("<Hangup/>"))
            .times(1)
            .returning(|_, _| Ok("CA2".to_string()));
        // Free plan has no LINE.
        mocks.dispatcher.expect_push_line().never();
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, expected, changes, event| {
                *expected == AlertStatus::Unanswered
                    && changes.status == Some("escalated".to_string())
                    && matches!(changes.family_notified_at, Some(Some(_)))
                    && changes.next_action_at == Some(None)
                    && event.as_ref().map(|e| e.to_status.as_deref()) == Some(Some("escalated"))
            })
            .returning(|_, _, _, _| Ok(true));
        mocks
            .alerts
            .expect_append_events()
            .withf(|events| {
                events.len() == 2 && events.iter().all(|event| event.kind == "family_notified")
            })
            .returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn help_reaches_staff_on_staffed_plans() {
        let home = household(NotifyChannel::Voice, None);
        let due = alert(home.id, AlertStatus::Help, 1);
        let features = PlanFeatures {
            staff_escalation: Some(true),
            ..PlanFeatures::default()
        };
        let mut mocks = Mocks::new().with_paid_plan(home.user_id, features);
        expect_household(&mut mocks, &home);

        mocks
            .contacts
            .expect_list_by_household()
            .returning(|_| Ok(Vec::new()));
        mocks
            .dispatcher
            .expect_send_sms()
            .with(eq(STAFF_PHONE), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok("SM-staff".to_string()));
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, _, changes, _| {
                matches!(changes.staff_notified_at, Some(Some(_)))
                    && matches!(changes.family_notified_at, Some(Some(_)))
                    && changes.status == Some("escalated".to_string())
            })
            .returning(|_, _, _, _| Ok(true));
        mocks
            .alerts
            .expect_append_events()
            .withf(|events| {
                events.iter().any(|event| event.kind == "staff_notified")
                    && events
                        .iter()
                        .any(|event| event.detail.as_deref() == Some("no contacts registered"))
            })
            .returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn deleted_household_parks_the_alert() {
        let due = alert(Uuid::new_v4(), AlertStatus::Unanswered, 0);
        let mut mocks = Mocks::new();

        mocks.households.expect_find_by_id().returning(|_| Ok(None));
        mocks.dispatcher.expect_place_call().never();
        mocks
            .alerts
            .expect_update_alert()
            .withf(|_, _, changes, event| {
                changes.next_action_at == Some(None)
                    && event.as_ref().map(|e| e.kind.as_str()) == Some("dispatch_failed")
            })
            .returning(|_, _, _, _| Ok(true));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_status_parks_the_alert() {
        let mut due = alert(Uuid::new_v4(), AlertStatus::Unanswered, 0);
        due.status = "on_hold".to_string();
        let due_id = due.id;
        let mut mocks = Mocks::new();

        mocks.households.expect_find_by_id().never();
        mocks.alerts.expect_update_alert().never();
        mocks
            .alerts
            .expect_park_alert()
            .withf(move |alert_id, reason| *alert_id == due_id && reason.contains("on_hold"))
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = mocks.into_usecase();
        usecase.process_alert(&due, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn one_failing_alert_does_not_stop_the_batch() {
        let home = household(NotifyChannel::Voice, None);
        let good = alert(home.id, AlertStatus::Unanswered, 0);
        let broken = alert(Uuid::new_v4(), AlertStatus::Unanswered, 0);
        let mut mocks = Mocks::new().with_free_plan();
        expect_household(&mut mocks, &home);

        let broken_household = broken.household_id;
        mocks
            .households
            .expect_find_by_id()
            .with(eq(broken_household))
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let batch = vec![broken.clone(), good.clone()];
        mocks
            .alerts
            .expect_claim_due_alerts()
            .returning(move |_, _, _| Ok(batch.clone()));
        mocks
            .dispatcher
            .expect_place_call()
            .times(1)
            .returning(|_, _, _| Ok("CA9".to_string()));
        mocks
            .alerts
            .expect_update_alert()
            .returning(|_, _, _, _| Ok(true));
        mocks.alerts.expect_append_events().returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        let summary = usecase.run_once(Utc::now()).await.unwrap();

        assert_eq!(summary.claimed, 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn contact_channels_respect_plan_and_flags() {
        let mut family = contact(Uuid::new_v4());
        assert_eq!(
            contact_channels(&family, &PlanFeatures::free_tier()),
            vec![NotifyChannel::Sms, NotifyChannel::Voice]
        );

        family.notify_sms = false;
        let with_line = PlanFeatures {
            line_enabled: Some(true),
            ..PlanFeatures::default()
        };
        assert_eq!(
            contact_channels(&family, &with_line),
            vec![NotifyChannel::Voice, NotifyChannel::Line]
        );
    }
}
