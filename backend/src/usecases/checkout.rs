use std::{collections::HashMap, sync::Arc};

use crates::domain::{
    repositories::subscriptions::{PendingInsert, SubscriptionRepository},
    value_objects::plans::PlanCatalog,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{SubscriptionError, UseCaseResult},
    stripe_gateway::StripeGateway,
};

pub struct CheckoutUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    stripe_client: Arc<Stripe>,
    catalog: Arc<PlanCatalog>,
}

impl<S, Stripe> CheckoutUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, stripe_client: Arc<Stripe>, catalog: Arc<PlanCatalog>) -> Self {
        Self {
            subscription_repo,
            stripe_client,
            catalog,
        }
    }

    /// Records a pending subscription and returns the Stripe Checkout URL.
    ///
    /// A pending row that already exists for the same plan is reused, so a
    /// double-clicked checkout yields two sessions but only one row.
    pub async fn start_checkout(&self, user_id: Uuid, raw_plan: &str) -> UseCaseResult<String> {
        let plan = self.catalog.resolve(raw_plan).map_err(|err| {
            warn!(%user_id, plan = %raw_plan, "checkout: unknown plan requested");
            SubscriptionError::UnknownPlan(err.0)
        })?;

        info!(%user_id, %plan, "checkout: checkout requested");

        let pending = self
            .subscription_repo
            .insert_pending_unless_active(user_id, plan)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan,
                    db_error = ?err,
                    "checkout: failed to record pending subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        let subscription = match pending {
            PendingInsert::Inserted(row) => {
                info!(%user_id, %plan, subscription_id = %row.id, "checkout: pending subscription created");
                row
            }
            PendingInsert::ExistingPending(row) => {
                info!(%user_id, %plan, subscription_id = %row.id, "checkout: reusing pending subscription");
                row
            }
            PendingInsert::ActiveExists(active) => {
                warn!(
                    %user_id,
                    %plan,
                    active_subscription_id = %active.id,
                    active_plan = %active.plan,
                    "checkout: user already has an active subscription"
                );
                return Err(SubscriptionError::AlreadySubscribed);
            }
        };

        let metadata = HashMap::from([
            ("plan".to_string(), plan.to_string()),
            ("user_id".to_string(), user_id.to_string()),
        ]);

        // The pending row is kept on failure; a retry reuses it.
        let redirect_url = self
            .stripe_client
            .create_checkout_session(
                self.catalog.external_reference_of(plan),
                &user_id.to_string(),
                metadata,
            )
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan,
                    subscription_id = %subscription.id,
                    error = ?err,
                    "checkout: failed to create stripe checkout session"
                );
                SubscriptionError::PaymentProvider(err)
            })?;

        info!(%user_id, %plan, "checkout: stripe checkout session created");
        Ok(redirect_url)
    }
}
