use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::{
    admin::AdminError, alerts::AlertError, households::HouseholdError, reports::ReportError,
    responses::ResponseError, subscriptions::SubscriptionError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Response {
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: error.into(),
        });
        (status, body).into_response()
    }
}

/// Internal errors are logged with their chain; the client only sees a generic message.
fn render(status: StatusCode, err: &dyn std::error::Error) -> Response {
    if status.is_server_error() {
        error!(error = %err, source = ?err.source(), "http: request failed");
        return ErrorResponse::new(status, "internal server error");
    }
    ErrorResponse::new(status, err.to_string())
}

macro_rules! impl_into_response {
    ($($error:ty),+ $(,)?) => {
        $(
            impl IntoResponse for $error {
                fn into_response(self) -> Response {
                    render(self.status_code(), &self)
                }
            }
        )+
    };
}

impl_into_response!(
    AdminError,
    AlertError,
    HouseholdError,
    ReportError,
    ResponseError,
    SubscriptionError,
);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let response = AlertError::StaleStatus.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["code"], 409);
        assert_eq!(body["error"], "stale alert status");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak() {
        let response =
            HouseholdError::Internal(anyhow::anyhow!("connection refused: 10.0.0.3:5432"))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
    }
}
