use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use crates::{
    domain::{
        repositories::{profiles::ProfileRepository, subscriptions::SubscriptionRepository},
        value_objects::{plans::PlanCatalog, subscriptions::ListResponse},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{profiles::ProfilePostgres, subscriptions::SubscriptionPostgres},
    },
    payments::stripe_client::StripeClient,
};

use crate::{
    auth::AuthUser,
    axum_http::routers::{cancellation, checkout},
    usecases::subscription_queries::SubscriptionQueryUseCase,
};

/// Everything served under `/subscriptions`.
pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    catalog: Arc<PlanCatalog>,
) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));
    let usecase = SubscriptionQueryUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(profile_repository),
        Arc::clone(&catalog),
    );

    Router::new()
        .route("/plans", get(list_plans::<SubscriptionPostgres, ProfilePostgres>))
        .route("/active", get(list_active::<SubscriptionPostgres, ProfilePostgres>))
        .route("/mine", get(list_mine::<SubscriptionPostgres, ProfilePostgres>))
        .with_state(Arc::new(usecase))
        .merge(checkout::routes(
            Arc::clone(&db_pool),
            stripe_client,
            Arc::clone(&catalog),
        ))
        .merge(cancellation::routes(db_pool, catalog))
}

pub async fn list_plans<S, P>(
    State(usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    Json(ListResponse {
        data: usecase.list_plans(),
    })
    .into_response()
}

pub async fn list_active<S, P>(
    State(usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    match usecase.active_for_user(user_id).await {
        Ok(data) => Json(ListResponse { data }).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_mine<S, P>(
    State(usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    match usecase.list_for_user(user_id).await {
        Ok(data) => Json(ListResponse { data }).into_response(),
        Err(err) => err.into_response(),
    }
}
