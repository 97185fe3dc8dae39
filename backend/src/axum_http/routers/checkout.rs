use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use crates::{
    domain::{
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            plans::PlanCatalog,
            subscriptions::{CreateCheckoutRequest, CreateCheckoutResponse},
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::subscriptions::SubscriptionPostgres,
    },
    payments::stripe_client::StripeClient,
};
use tracing::info;

use crate::{
    auth::AuthUser,
    usecases::{checkout::CheckoutUseCase, stripe_gateway::StripeGateway},
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    catalog: Arc<PlanCatalog>,
) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let usecase = CheckoutUseCase::new(Arc::new(subscription_repository), stripe_client, catalog);

    Router::new()
        .route(
            "/checkout",
            post(start_checkout::<SubscriptionPostgres, StripeClient>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn start_checkout<S, Stripe>(
    State(usecase): State<Arc<CheckoutUseCase<S, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    info!(%user_id, plan = %request.plan, "checkout: request received");

    match usecase.start_checkout(user_id, &request.plan).await {
        Ok(redirect_url) => Json(CreateCheckoutResponse { redirect_url }).into_response(),
        Err(err) => err.into_response(),
    }
}
