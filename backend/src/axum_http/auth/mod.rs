use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::config_loader;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: Option<String>,
    pub role: String,
    pub email: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub is_admin: bool,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            format!("Unauthorized: {}", self.0),
        )
            .into_response()
    }
}

pub fn validate_supabase_jwt(token: &str, secret: &str) -> Result<SupabaseClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_audience(&["authenticated", "service_role"]);

    let token_data = decode::<SupabaseClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

impl AuthUser {
    /// Service-role tokens carry no `sub`; they act as the nil admin user.
    pub fn from_claims(claims: SupabaseClaims) -> Result<Self, AuthError> {
        let is_service = claims.role == "service_role";
        let is_admin = is_service || claims.app_metadata.role.as_deref() == Some("admin");

        let user_id = match claims.sub.as_deref() {
            Some(sub) => Uuid::parse_str(sub)
                .map_err(|_| anyhow::anyhow!("Invalid user ID in token"))?,
            None if is_service => Uuid::nil(),
            None => return Err(anyhow::anyhow!("Missing user ID in token").into()),
        };

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
            is_admin,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let auth_str = auth_header.to_str().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            )
        })?;

        let token = auth_str.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format".to_string(),
        ))?;

        let secret = config_loader::get_supabase_jwt_secret().map_err(|e| {
            tracing::error!(error = ?e, "auth: jwt secret is not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication is not configured".to_string(),
            )
        })?;

        let claims = validate_supabase_jwt(token, &secret)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.0.to_string()))?;

        AuthUser::from_claims(claims).map_err(|e| (StatusCode::UNAUTHORIZED, e.0.to_string()))
    }
}

#[cfg(test)]
mod tests;
