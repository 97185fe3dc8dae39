use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, SubscriptionWithProfileRow},
    value_objects::{enums::plan_names::Plan, subscriptions::SubscriptionFilter},
};

/// Result of the atomic checkout guard + insert.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingInsert {
    Inserted(SubscriptionEntity),
    /// A pending row for the same `(user_id, plan)` already existed and was reused.
    ExistingPending(SubscriptionEntity),
    /// The user already owns an active subscription; nothing was written.
    ActiveExists(SubscriptionEntity),
}

/// Result of a conditional status update keyed on the current status.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalTransition {
    Applied(SubscriptionEntity),
    /// No row was in the expected state; zero rows changed.
    NoMatch,
    /// The store refused the write because the user already has another active row.
    ActiveConflict,
}

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Active rows owned by the user. The checkout guard uses the same predicate.
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;

    async fn list_with_profiles(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Vec<SubscriptionWithProfileRow>>;

    async fn insert_pending_unless_active(&self, user_id: Uuid, plan: Plan) -> Result<PendingInsert>;

    /// `pending -> active` for `(user_id, plan, status = pending)`, setting `start_date`.
    async fn activate_pending(
        &self,
        user_id: Uuid,
        plan: Plan,
        start_date: DateTime<Utc>,
    ) -> Result<ConditionalTransition>;

    /// `active -> canceled` for `(user_id, plan, status = active)`, setting `end_date`.
    async fn cancel_active(
        &self,
        user_id: Uuid,
        plan: Plan,
        end_date: DateTime<Utc>,
    ) -> Result<ConditionalTransition>;
}
