use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use super::{line::LineClient, line::LineMessage, twilio::TwilioClient};

/// Outbound channels used by escalation. Every call returns the provider's
/// reference for the message (call sid, message sid or request id).
#[automock]
#[async_trait]
pub trait NotificationDispatcher {
    /// Places a check-in call. Twilio fetches TwiML from `voice_url` and
    /// reports the outcome to `status_url`.
    async fn place_call(&self, to: &str, voice_url: &str, status_url: &str) -> Result<String>;

    /// One-way call that reads `twiml` and hangs up.
    async fn announce_call(&self, to: &str, twiml: &str) -> Result<String>;

    async fn send_sms(&self, to: &str, body: &str) -> Result<String>;

    async fn push_line(&self, to: &str, message: &LineMessage) -> Result<String>;
}

/// Routes voice and SMS to Twilio and pushes to LINE when a channel is configured.
pub struct LiveDispatcher {
    twilio: TwilioClient,
    line: Option<LineClient>,
}

impl LiveDispatcher {
    pub fn new(twilio: TwilioClient, line: Option<LineClient>) -> Self {
        Self { twilio, line }
    }
}

#[async_trait]
impl NotificationDispatcher for LiveDispatcher {
    async fn place_call(&self, to: &str, voice_url: &str, status_url: &str) -> Result<String> {
        self.twilio.place_call(to, voice_url, status_url).await
    }

    async fn announce_call(&self, to: &str, twiml: &str) -> Result<String> {
        self.twilio.announce_call(to, twiml).await
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<String> {
        self.twilio.send_sms(to, body).await
    }

    async fn push_line(&self, to: &str, message: &LineMessage) -> Result<String> {
        match self.line.as_ref() {
            Some(line) => line.push(to, message).await,
            None => anyhow::bail!("LINE channel is not configured"),
        }
    }
}
