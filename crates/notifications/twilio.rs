use anyhow::Result;
use serde::Deserialize;
use tracing::error;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Voice and SMS over the Twilio REST API.
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct TwilioResourceResp {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResp {
    code: Option<i64>,
    message: Option<String>,
    more_info: Option<String>,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{}.json",
            TWILIO_API_BASE, self.account_sid, resource
        )
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (twilio_code, twilio_message, twilio_more_info) =
            match serde_json::from_str::<TwilioErrorResp>(&body) {
                Ok(details) => (details.code, details.message, details.more_info),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            twilio_code = ?twilio_code,
            twilio_message = ?twilio_message,
            twilio_more_info = ?twilio_more_info,
            context = %context,
            "twilio api request failed"
        );

        anyhow::bail!(
            "Twilio API request failed: {} (status {}, code={:?})",
            context,
            status,
            twilio_code
        );
    }

    async fn post_form(&self, resource: &str, form: &[(&str, &str)], context: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.resource_url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, context).await?;

        let parsed: TwilioResourceResp = resp.json().await?;
        Ok(parsed.sid)
    }

    /// https://www.twilio.com/docs/voice/api/call-resource#create-a-call-resource
    pub async fn place_call(&self, to: &str, voice_url: &str, status_url: &str) -> Result<String> {
        let form = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Url", voice_url),
            ("Method", "POST"),
            ("StatusCallback", status_url),
            ("StatusCallbackMethod", "POST"),
            ("StatusCallbackEvent", "completed"),
        ];

        self.post_form("Calls", &form, "place call").await
    }

    pub async fn announce_call(&self, to: &str, twiml: &str) -> Result<String> {
        let form = [("To", to), ("From", self.from_number.as_str()), ("Twiml", twiml)];

        self.post_form("Calls", &form, "announce call").await
    }

    /// https://www.twilio.com/docs/messaging/api/message-resource#create-a-message-resource
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<String> {
        let form = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        self.post_form("Messages", &form, "send sms").await
    }
}

/// Twilio `CallStatus` values that mean nobody answered.
pub fn is_unanswered_call_status(call_status: &str) -> bool {
    matches!(call_status, "no-answer" | "busy" | "failed" | "canceled")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanswered_statuses() {
        for status in ["no-answer", "busy", "failed", "canceled"] {
            assert!(is_unanswered_call_status(status), "{status}");
        }
        assert!(!is_unanswered_call_status("completed"));
        assert!(!is_unanswered_call_status("in-progress"));
    }

    #[test]
    fn resource_url_is_scoped_to_account() {
        let client = TwilioClient::new("AC123".into(), "token".into(), "+815012345678".into());

        assert_eq!(
            client.resource_url("Calls"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
    }
}
