use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::error;
use uuid::Uuid;

use crate::domain::value_objects::alerts::CallResponse;

type HmacSha256 = Hmac<Sha256>;

const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

#[derive(Debug, Clone, PartialEq)]
pub enum LineMessage {
    Text(String),
    /// Buttons template asking the household to answer ok, tired or help.
    CheckIn { alert_id: Uuid, text: String },
}

impl LineMessage {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LineMessage::Text(text) => json!({ "type": "text", "text": text }),
            LineMessage::CheckIn { alert_id, text } => {
                let action = |label: &str, response: CallResponse| {
                    json!({
                        "type": "postback",
                        "label": label,
                        "data": format!("alert_id={}&response={}", alert_id, response.as_str()),
                        "displayText": label,
                    })
                };

                json!({
                    "type": "template",
                    "altText": text,
                    "template": {
                        "type": "buttons",
                        "text": text,
                        "actions": [
                            action("大丈夫", CallResponse::Ok),
                            action("少し疲れた", CallResponse::Tired),
                            action("助けが必要", CallResponse::Help),
                        ],
                    },
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LineWebhookBody {
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

#[derive(Debug, Deserialize)]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub postback: Option<LinePostback>,
    pub source: Option<LineSource>,
}

#[derive(Debug, Deserialize)]
pub struct LinePostback {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct LineSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub struct LineClient {
    http: reqwest::Client,
    channel_access_token: String,
}

impl LineClient {
    pub fn new(channel_access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            channel_access_token,
        }
    }

    /// https://developers.line.biz/en/reference/messaging-api/#send-push-message
    pub async fn push(&self, to: &str, message: &LineMessage) -> Result<String> {
        let retry_key = Uuid::new_v4().to_string();
        let body = json!({ "to": to, "messages": [message.to_json()] });

        let resp = self
            .http
            .post(LINE_PUSH_URL)
            .header(AUTHORIZATION, format!("Bearer {}", self.channel_access_token))
            .header("X-Line-Retry-Key", &retry_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-line-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = %status,
                line_request_id = ?request_id,
                response_body = %body,
                "line push request failed"
            );
            anyhow::bail!("LINE push failed (status {}, request_id={:?})", status, request_id);
        }

        Ok(request_id.unwrap_or(retry_key))
    }
}

/// `X-Line-Signature` is base64(HMAC-SHA256(channel_secret, body)).
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let provided = STANDARD
        .decode(signature.trim())
        .context("line: signature is not base64")?;

    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| anyhow::anyhow!("line: invalid signature"))?;

    Ok(())
}

/// Parses postback data of the form `alert_id=<uuid>&response=ok|tired|help`.
pub fn parse_postback_data(data: &str) -> Option<(Uuid, CallResponse)> {
    let mut alert_id = None;
    let mut response = None;

    for (key, value) in url::form_urlencoded::parse(data.as_bytes()) {
        match key.as_ref() {
            "alert_id" => alert_id = Uuid::parse_str(&value).ok(),
            "response" => response = CallResponse::from_str(&value),
            _ => {}
        }
    }

    Some((alert_id?, response?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn signature_over_exact_body_verifies() {
        let body = br#"{"events":[]}"#;
        let signature = sign("channel-secret", body);

        assert!(verify_signature("channel-secret", body, &signature).is_ok());
        assert!(verify_signature("channel-secret", br#"{"events":[1]}"#, &signature).is_err());
        assert!(verify_signature("other-secret", body, &signature).is_err());
        assert!(verify_signature("channel-secret", body, "not base64!").is_err());
    }

    #[test]
    fn postback_data_round_trips_through_check_in_template() {
        let alert_id = Uuid::new_v4();
        let message = LineMessage::CheckIn {
            alert_id,
            text: "体調はいかがですか".to_string(),
        };

        let json = message.to_json();
        let data = json["template"]["actions"][2]["data"].as_str().unwrap();

        assert_eq!(parse_postback_data(data), Some((alert_id, CallResponse::Help)));
    }

    #[test]
    fn malformed_postback_is_ignored() {
        assert_eq!(parse_postback_data("alert_id=nope&response=ok"), None);
        assert_eq!(
            parse_postback_data(&format!("alert_id={}&response=maybe", Uuid::new_v4())),
            None
        );
        assert_eq!(parse_postback_data(""), None);
    }

    #[test]
    fn webhook_body_parses_postback_events() {
        let body = r#"{"destination":"U0","events":[{"type":"postback","postback":{"data":"x=1"},"source":{"type":"user","userId":"U123"}}]}"#;

        let parsed: LineWebhookBody = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].type_, "postback");
        assert_eq!(
            parsed.events[0].source.as_ref().and_then(|s| s.user_id.as_deref()),
            Some("U123")
        );
    }
}
