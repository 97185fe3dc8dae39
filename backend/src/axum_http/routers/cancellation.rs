use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use crates::{
    domain::{
        repositories::{profiles::ProfileRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            plans::PlanCatalog,
            subscriptions::{CancelSubscriptionRequest, CancelSubscriptionResponse},
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{profiles::ProfilePostgres, subscriptions::SubscriptionPostgres},
    },
};

use crate::{auth::AuthUser, usecases::cancellation::CancellationUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>, catalog: Arc<PlanCatalog>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));
    let usecase = CancellationUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(profile_repository),
        catalog,
    );

    Router::new()
        .route(
            "/cancel",
            post(cancel_subscription::<SubscriptionPostgres, ProfilePostgres>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn cancel_subscription<S, P>(
    State(usecase): State<Arc<CancellationUseCase<S, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CancelSubscriptionRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    match usecase
        .cancel(user_id, request.target_user_id, &request.plan)
        .await
    {
        Ok(()) => Json(CancelSubscriptionResponse { success: true }).into_response(),
        Err(err) => err.into_response(),
    }
}
