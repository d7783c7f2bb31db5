use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{dispatcher::NotificationDispatcher, line::LineMessage};

/// Logs instead of sending. Used when `NOTIFY_MODE=stub`.
#[derive(Debug, Default)]
pub struct StubDispatcher;

impl StubDispatcher {
    fn reference(kind: &str) -> String {
        format!("stub-{}-{}", kind, Uuid::new_v4())
    }
}

#[async_trait]
impl NotificationDispatcher for StubDispatcher {
    async fn place_call(&self, to: &str, voice_url: &str, status_url: &str) -> Result<String> {
        let reference = Self::reference("call");
        info!(%to, %voice_url, %status_url, %reference, "notify stub: place_call");
        Ok(reference)
    }

    async fn announce_call(&self, to: &str, twiml: &str) -> Result<String> {
        let reference = Self::reference("call");
        info!(%to, twiml_len = twiml.len(), %reference, "notify stub: announce_call");
        Ok(reference)
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<String> {
        let reference = Self::reference("sms");
        info!(%to, %body, %reference, "notify stub: send_sms");
        Ok(reference)
    }

    async fn push_line(&self, to: &str, message: &LineMessage) -> Result<String> {
        let reference = Self::reference("line");
        info!(%to, message = %message.to_json(), %reference, "notify stub: push_line");
        Ok(reference)
    }
}
