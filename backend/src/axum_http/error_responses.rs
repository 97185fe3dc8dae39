use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::SubscriptionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SubscriptionError::Internal(err) => {
                // Don't leak internal error detail to client
                error!(status = status.as_u16(), error = ?err, "http: internal error");
                "Internal server error".to_string()
            }
            SubscriptionError::PaymentProvider(err) => {
                error!(status = status.as_u16(), error = ?err, "http: payment provider error");
                "Payment provider is unavailable, please try again".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: self.code(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    async fn render(err: SubscriptionError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_renders_code_and_actionable_message() {
        let (status, body) = render(SubscriptionError::AlreadySubscribed).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "already_subscribed");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("cancel your existing subscription first")
        );
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = render(SubscriptionError::Internal(anyhow::anyhow!(
            "password authentication failed for user postgres"
        )))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn provider_details_are_hidden() {
        let (status, body) =
            render(SubscriptionError::PaymentProvider(anyhow::anyhow!("sk_live_leak"))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["message"].as_str().unwrap().contains("sk_live"));
    }
}
