use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{
        repositories::{profiles::ProfileRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            plans::PlanCatalog,
            subscriptions::{ListResponse, SubscriptionFilter},
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{profiles::ProfilePostgres, subscriptions::SubscriptionPostgres},
    },
};

use crate::{auth::AuthUser, usecases::subscription_queries::SubscriptionQueryUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>, catalog: Arc<PlanCatalog>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));
    let usecase = SubscriptionQueryUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(profile_repository),
        catalog,
    );

    Router::new()
        .route("/", get(list_subscriptions::<SubscriptionPostgres, ProfilePostgres>))
        .route("/report", get(report::<SubscriptionPostgres, ProfilePostgres>))
        .with_state(Arc::new(usecase))
}

pub async fn list_subscriptions<S, P>(
    State(usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(filter): Query<SubscriptionFilter>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    match usecase.list_all(user_id, filter).await {
        Ok(data) => Json(ListResponse { data }).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn report<S, P>(
    State(usecase): State<Arc<SubscriptionQueryUseCase<S, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(filter): Query<SubscriptionFilter>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    match usecase.report(user_id, filter).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => err.into_response(),
    }
}
