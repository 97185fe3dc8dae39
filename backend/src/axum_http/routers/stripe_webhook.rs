use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::subscriptions::SubscriptionRepository,
        value_objects::subscriptions::WebhookAckResponse,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::subscriptions::SubscriptionPostgres,
    },
    payments::stripe_client::StripeClient,
};
use tracing::{debug, warn};

use crate::usecases::{
    errors::SubscriptionError, payment_webhook::PaymentWebhookUseCase,
    stripe_gateway::StripeGateway,
};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repository), stripe_client);

    Router::new()
        .route(
            "/webhook",
            post(stripe_webhook::<SubscriptionPostgres, StripeClient>),
        )
        .with_state(Arc::new(usecase))
}

/// Takes the raw body: the signature covers the exact bytes Stripe sent.
pub async fn stripe_webhook<S, Stripe>(
    State(usecase): State<Arc<PaymentWebhookUseCase<S, Stripe>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let Some(signature) = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("stripe webhook: missing signature header");
        return SubscriptionError::InvalidSignature.into_response();
    };

    match usecase.handle_payment_event(&body, signature).await {
        Ok(outcome) => {
            debug!(?outcome, "stripe webhook: acknowledged");
            Json(WebhookAckResponse { received: true }).into_response()
        }
        Err(err) => err.into_response(),
    }
}
