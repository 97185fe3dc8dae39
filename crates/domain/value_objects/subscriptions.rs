use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, SubscriptionWithProfileRow},
    value_objects::enums::{plan_names::Plan, subscription_statuses::SubscriptionStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionEntity> for SubscriptionModel {
    type Error = anyhow::Error;

    fn try_from(entity: SubscriptionEntity) -> Result<Self> {
        let plan = entity
            .plan
            .parse::<Plan>()
            .with_context(|| format!("subscription {} has an invalid plan", entity.id))?;
        let status = entity
            .status
            .parse::<SubscriptionStatus>()
            .with_context(|| format!("subscription {} has an invalid status", entity.id))?;

        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            plan,
            status,
            start_date: entity.start_date,
            end_date: entity.end_date,
            created_at: entity.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

/// Admin listing row: a subscription plus the owner's display fields, `None`
/// when the owner has no profile row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: SubscriptionModel,
    pub profile: Option<ProfileSummary>,
}

impl TryFrom<SubscriptionWithProfileRow> for SubscriptionView {
    type Error = anyhow::Error;

    fn try_from(row: SubscriptionWithProfileRow) -> Result<Self> {
        let profile = row.profile_id.map(|_| ProfileSummary {
            full_name: row.full_name,
            email: row.email,
        });

        Ok(Self {
            subscription: SubscriptionModel::try_from(row.subscription)?,
            profile,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub plan: Option<Plan>,
    pub status: Option<SubscriptionStatus>,
    pub search: Option<String>,
}

impl SubscriptionFilter {
    /// Trimmed search text, `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCheckoutResponse {
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub plan: String,
    /// Omitted for self-service cancellation.
    pub target_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelSubscriptionResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookAckResponse {
    pub received: bool,
}
