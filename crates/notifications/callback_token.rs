use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

pub const VOICE_CALLBACK_PATH: &str = "api/v1/webhooks/twilio/voice";
pub const STATUS_CALLBACK_PATH: &str = "api/v1/webhooks/twilio/status";

#[derive(Debug, Serialize, Deserialize)]
struct CallbackClaims {
    alert_id: Uuid,
    exp: usize,
}

/// Mints and checks the short-lived tokens carried by Twilio callback URLs.
#[derive(Clone)]
pub struct CallbackSigner {
    secret: String,
    ttl: Duration,
}

impl CallbackSigner {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn mint(&self, alert_id: Uuid) -> Result<String> {
        let exp = (Utc::now() + self.ttl).timestamp().max(0) as usize;
        let claims = CallbackClaims { alert_id, exp };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("callback_token: failed to sign token")?;

        Ok(token)
    }

    /// Fails when the token is expired, forged, or minted for another alert.
    pub fn verify(&self, token: &str, alert_id: Uuid) -> Result<()> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<CallbackClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .context("callback_token: invalid token")?;

        if data.claims.alert_id != alert_id {
            anyhow::bail!("callback_token: token was issued for another alert");
        }

        Ok(())
    }

    pub fn voice_url(&self, public_base_url: &Url, alert_id: Uuid) -> Result<Url> {
        self.signed_url(public_base_url, VOICE_CALLBACK_PATH, alert_id)
    }

    pub fn status_url(&self, public_base_url: &Url, alert_id: Uuid) -> Result<Url> {
        self.signed_url(public_base_url, STATUS_CALLBACK_PATH, alert_id)
    }

    fn signed_url(&self, public_base_url: &Url, path: &str, alert_id: Uuid) -> Result<Url> {
        let token = self.mint(alert_id)?;
        let mut url = public_base_url
            .join(path)
            .with_context(|| format!("callback_token: cannot join {path}"))?;

        url.query_pairs_mut()
            .append_pair("alert_id", &alert_id.to_string())
            .append_pair("token", &token);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> CallbackSigner {
        CallbackSigner::new("callback-secret", Duration::hours(1))
    }

    #[test]
    fn minted_token_verifies_for_its_alert_only() {
        let alert_id = Uuid::new_v4();
        let token = signer().mint(alert_id).unwrap();

        assert!(signer().verify(&token, alert_id).is_ok());
        assert!(signer().verify(&token, Uuid::new_v4()).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let alert_id = Uuid::new_v4();
        let token = CallbackSigner::new("other", Duration::hours(1))
            .mint(alert_id)
            .unwrap();

        assert!(signer().verify(&token, alert_id).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let alert_id = Uuid::new_v4();
        let token = CallbackSigner::new("callback-secret", Duration::hours(-2))
            .mint(alert_id)
            .unwrap();

        assert!(signer().verify(&token, alert_id).is_err());
    }

    #[test]
    fn voice_url_carries_alert_and_token() {
        let base = Url::parse("https://watch.example.com/").unwrap();
        let alert_id = Uuid::new_v4();

        let url = signer().voice_url(&base, alert_id).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/api/v1/webhooks/twilio/voice");
        assert_eq!(pairs[0], ("alert_id".to_string(), alert_id.to_string()));
        assert!(signer().verify(&pairs[1].1, alert_id).is_ok());
    }
}
