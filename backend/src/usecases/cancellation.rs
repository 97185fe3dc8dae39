use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    repositories::{
        profiles::ProfileRepository,
        subscriptions::{ConditionalTransition, SubscriptionRepository},
    },
    value_objects::plans::PlanCatalog,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    access::AdminAuthorizer,
    errors::{SubscriptionError, UseCaseResult},
};

pub struct CancellationUseCase<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    authorizer: AdminAuthorizer<P>,
    catalog: Arc<PlanCatalog>,
}

impl<S, P> CancellationUseCase<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, profile_repo: Arc<P>, catalog: Arc<PlanCatalog>) -> Self {
        Self {
            subscription_repo,
            authorizer: AdminAuthorizer::new(profile_repo),
            catalog,
        }
    }

    /// Ends an active subscription immediately. Cancelling for another user
    /// requires an admin profile.
    pub async fn cancel(
        &self,
        actor_id: Uuid,
        target_user_id: Option<Uuid>,
        raw_plan: &str,
    ) -> UseCaseResult<()> {
        let target_user_id = target_user_id.unwrap_or(actor_id);

        if target_user_id != actor_id {
            self.authorizer.require_admin(actor_id).await.inspect_err(|_| {
                warn!(
                    %actor_id,
                    %target_user_id,
                    "cancellation: refused to cancel another user's subscription"
                );
            })?;
        }

        let plan = self
            .catalog
            .resolve(raw_plan)
            .map_err(|err| SubscriptionError::UnknownPlan(err.0))?;

        info!(%actor_id, %target_user_id, %plan, "cancellation: cancel requested");

        let transition = self
            .subscription_repo
            .cancel_active(target_user_id, plan, Utc::now())
            .await
            .map_err(|err| {
                error!(
                    %actor_id,
                    %target_user_id,
                    %plan,
                    db_error = ?err,
                    "cancellation: failed to cancel subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        match transition {
            ConditionalTransition::Applied(row) => {
                info!(
                    %actor_id,
                    %target_user_id,
                    %plan,
                    subscription_id = %row.id,
                    "cancellation: subscription canceled"
                );
                Ok(())
            }
            ConditionalTransition::NoMatch | ConditionalTransition::ActiveConflict => {
                info!(
                    %actor_id,
                    %target_user_id,
                    %plan,
                    "cancellation: no active subscription to cancel"
                );
                Err(SubscriptionError::NoActiveSubscription)
            }
        }
    }
}
