use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// New rows are always inserted as `pending` with both dates left null.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
}

/// A subscription row left-joined with the owner's profile display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionWithProfileRow {
    pub subscription: SubscriptionEntity,
    pub profile_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl From<(SubscriptionEntity, Option<Uuid>, Option<String>, Option<String>)>
    for SubscriptionWithProfileRow
{
    fn from(
        (subscription, profile_id, full_name, email): (
            SubscriptionEntity,
            Option<Uuid>,
            Option<String>,
            Option<String>,
        ),
    ) -> Self {
        Self {
            subscription,
            profile_id,
            full_name,
            email,
        }
    }
}
