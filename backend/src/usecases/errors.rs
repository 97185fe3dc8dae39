use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
    #[error("you already have an active subscription; cancel your existing subscription first")]
    AlreadySubscribed,
    #[error("no active subscription for this plan; only active subscriptions can be canceled")]
    NoActiveSubscription,
    #[error("only administrators can manage another user's subscription")]
    Forbidden,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),
    #[error("payment provider request failed")]
    PaymentProvider(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::UnknownPlan(_)
            | SubscriptionError::InvalidSignature
            | SubscriptionError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::AlreadySubscribed | SubscriptionError::NoActiveSubscription => {
                StatusCode::CONFLICT
            }
            SubscriptionError::Forbidden => StatusCode::FORBIDDEN,
            SubscriptionError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SubscriptionError::UnknownPlan(_) => "unknown_plan",
            SubscriptionError::AlreadySubscribed => "already_subscribed",
            SubscriptionError::NoActiveSubscription => "no_active_subscription",
            SubscriptionError::Forbidden => "forbidden",
            SubscriptionError::InvalidSignature => "invalid_signature",
            SubscriptionError::MalformedEvent(_) => "malformed_event",
            SubscriptionError::PaymentProvider(_) => "payment_provider_error",
            SubscriptionError::Internal(_) => "internal_error",
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;
