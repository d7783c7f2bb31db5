use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use mockall::automock;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signed webhooks older or newer than this are refused.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Billing operations the subscription use case needs from Stripe.
#[automock]
#[async_trait]
pub trait StripeGateway {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<String>;

    async fn cancel_subscription(&self, provider_subscription_id: &str) -> Result<()>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription>;

    fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str)
    -> Result<StripeEvent>;
}

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub subscription: Option<String>,
    pub customer: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: Option<String>,
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscription {
    pub id: Option<String>,
    pub status: Option<String>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub billing_cycle_anchor: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Period start, falling back to the first item or the billing cycle anchor.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| {
                self.items
                    .data
                    .first()
                    .and_then(|item| item.current_period_start)
            })
            .or(self.billing_cycle_anchor)
    }

    /// Newer API versions only report the period on subscription items.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
            success_url,
            cancel_url,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (details.type_, details.code, details.param, details.message)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    pub fn extract_subscription(event: &StripeEvent) -> Option<StripeSubscription> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    pub fn extract_invoice(event: &StripeEvent) -> Option<StripeInvoice> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

#[async_trait]
impl StripeGateway for StripeClient {
    /// Recurring card checkout. https://stripe.com/docs/payments/checkout
    async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_email: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        if let Some(email) = customer_email {
            body.push(("customer_email".to_string(), email));
        }

        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value.clone()));
            body.push((format!("subscription_data[metadata][{}]", key), value));
        }

        let resp = self
            .http
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))
    }

    /// https://stripe.com/docs/api/subscriptions/cancel#cancel_subscription-at_period_end
    async fn cancel_subscription(&self, provider_subscription_id: &str) -> Result<()> {
        let body = [("cancel_at_period_end", "true".to_string())];
        let resp = self
            .http
            .post(format!(
                "{}/subscriptions/{}",
                STRIPE_API_BASE, provider_subscription_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        Self::ensure_success(resp, "cancel subscription").await?;

        Ok(())
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let resp = self
            .http
            .get(format!("{}/subscriptions/{}", STRIPE_API_BASE, subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// https://stripe.com/docs/webhooks/signatures
    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        verify_signature_at(
            &self.webhook_secret,
            payload,
            signature_header,
            Utc::now().timestamp(),
        )
    }
}

fn verify_signature_at(
    webhook_secret: &str,
    payload: &[u8],
    signature_header: &str,
    now: i64,
) -> Result<StripeEvent> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }

    let signed_at: i64 = timestamp.parse()?;
    if (now - signed_at).abs() > WEBHOOK_TOLERANCE_SECS {
        anyhow::bail!("stripe-signature timestamp outside tolerance");
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|provided| mac.clone().verify_slice(&provided).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        anyhow::bail!("invalid webhook signature");
    }

    let event: StripeEvent = serde_json::from_slice(payload)?;
    Ok(event)
}
