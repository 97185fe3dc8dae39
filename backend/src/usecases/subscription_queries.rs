use std::sync::Arc;

use anyhow::Result as AnyResult;
use crates::domain::{
    repositories::{profiles::ProfileRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        plans::{PlanCatalog, PlanDto},
        subscription_reports::SubscriptionReport,
        subscriptions::{SubscriptionFilter, SubscriptionModel, SubscriptionView},
    },
};
use tracing::{error, info};
use uuid::Uuid;

use super::{
    access::AdminAuthorizer,
    errors::{SubscriptionError, UseCaseResult},
};

/// Read side. Never writes.
pub struct SubscriptionQueryUseCase<S, P>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: ProfileRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    authorizer: AdminAuthorizer<P>,
    catalog: Arc<PlanCatalog>,
}

impl<S, P> SubscriptionQueryUseCase<S, P>
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

    pub fn list_plans(&self) -> Vec<PlanDto> {
        self.catalog.plans()
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> UseCaseResult<Vec<SubscriptionModel>> {
        let rows = self.subscription_repo.list_by_user(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "subscriptions: failed to list user subscriptions");
            SubscriptionError::Internal(err)
        })?;

        Ok(rows
            .into_iter()
            .map(SubscriptionModel::try_from)
            .collect::<AnyResult<Vec<_>>>()?)
    }

    pub async fn active_for_user(&self, user_id: Uuid) -> UseCaseResult<Vec<SubscriptionModel>> {
        let rows = self
            .subscription_repo
            .find_active_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load active subscriptions");
                SubscriptionError::Internal(err)
            })?;

        Ok(rows
            .into_iter()
            .map(SubscriptionModel::try_from)
            .collect::<AnyResult<Vec<_>>>()?)
    }

    pub async fn has_active(&self, user_id: Uuid) -> UseCaseResult<bool> {
        Ok(!self.active_for_user(user_id).await?.is_empty())
    }

    pub async fn list_all(
        &self,
        actor_id: Uuid,
        filter: SubscriptionFilter,
    ) -> UseCaseResult<Vec<SubscriptionView>> {
        self.authorizer.require_admin(actor_id).await?;
        self.load_views(actor_id, filter).await
    }

    pub async fn report(
        &self,
        actor_id: Uuid,
        filter: SubscriptionFilter,
    ) -> UseCaseResult<SubscriptionReport> {
        self.authorizer.require_admin(actor_id).await?;

        let subscriptions: Vec<SubscriptionModel> = self
            .load_views(actor_id, filter)
            .await?
            .into_iter()
            .map(|view| view.subscription)
            .collect();

        Ok(SubscriptionReport::from_subscriptions(&subscriptions))
    }

    async fn load_views(
        &self,
        actor_id: Uuid,
        filter: SubscriptionFilter,
    ) -> UseCaseResult<Vec<SubscriptionView>> {
        info!(
            %actor_id,
            plan = ?filter.plan,
            status = ?filter.status,
            search = ?filter.search_text(),
            "subscriptions: admin listing requested"
        );

        let rows = self
            .subscription_repo
            .list_with_profiles(filter)
            .await
            .map_err(|err| {
                error!(%actor_id, db_error = ?err, "subscriptions: failed to list subscriptions");
                SubscriptionError::Internal(err)
            })?;

        let views = rows
            .into_iter()
            .map(SubscriptionView::try_from)
            .collect::<AnyResult<Vec<_>>>()?;

        info!(%actor_id, row_count = views.len(), "subscriptions: admin listing loaded");
        Ok(views)
    }
}
