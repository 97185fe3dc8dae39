use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    PgConnection, RunQueryDsl, insert_into,
    pg::Pg,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_types::Bool,
    update,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::{
            InsertSubscriptionEntity, SubscriptionEntity, SubscriptionWithProfileRow,
        },
        repositories::subscriptions::{
            ConditionalTransition, PendingInsert, SubscriptionRepository,
        },
        value_objects::{
            enums::{plan_names::Plan, subscription_statuses::SubscriptionStatus},
            subscriptions::SubscriptionFilter,
        },
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{profiles, subscriptions},
    },
};

/// Partial unique index over `(user_id) WHERE status = 'active'`.
pub const ONE_ACTIVE_PER_USER_INDEX: &str = "subscriptions_one_active_per_user";
/// Partial unique index over `(user_id, plan) WHERE status = 'pending'`.
pub const ONE_PENDING_PER_USER_PLAN_INDEX: &str = "subscriptions_one_pending_per_user_plan";

const SERIALIZATION_ATTEMPTS: usize = 3;

type SubscriptionPredicate = Box<dyn BoxableExpression<subscriptions::table, Pg, SqlType = Bool>>;

/// Shared by the active-subscription query and the checkout guard so both
/// always agree on what "active" means.
fn active_for_user(user_id: Uuid) -> SubscriptionPredicate {
    Box::new(
        subscriptions::user_id
            .eq(user_id)
            .and(subscriptions::status.eq(SubscriptionStatus::Active.as_str())),
    )
}

fn pending_for_user_plan(user_id: Uuid, plan: Plan) -> SubscriptionPredicate {
    Box::new(
        subscriptions::user_id
            .eq(user_id)
            .and(subscriptions::plan.eq(plan.as_str()))
            .and(subscriptions::status.eq(SubscriptionStatus::Pending.as_str())),
    )
}

fn find_pending(
    conn: &mut PgConnection,
    user_id: Uuid,
    plan: Plan,
) -> QueryResult<Option<SubscriptionEntity>> {
    subscriptions::table
        .filter(pending_for_user_plan(user_id, plan))
        .select(SubscriptionEntity::as_select())
        .first::<SubscriptionEntity>(conn)
        .optional()
}

fn guarded_pending_insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    plan: Plan,
) -> QueryResult<PendingInsert> {
    if let Some(active) = subscriptions::table
        .filter(active_for_user(user_id))
        .select(SubscriptionEntity::as_select())
        .first::<SubscriptionEntity>(conn)
        .optional()?
    {
        return Ok(PendingInsert::ActiveExists(active));
    }

    if let Some(pending) = find_pending(conn, user_id, plan)? {
        return Ok(PendingInsert::ExistingPending(pending));
    }

    let inserted = insert_into(subscriptions::table)
        .values(&InsertSubscriptionEntity {
            user_id,
            plan: plan.as_str().to_string(),
            status: SubscriptionStatus::Pending.as_str().to_string(),
        })
        .returning(SubscriptionEntity::as_returning())
        .get_result::<SubscriptionEntity>(conn)?;

    Ok(PendingInsert::Inserted(inserted))
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(active_for_user(user_id))
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order((
                subscriptions::start_date.desc().nulls_last(),
                subscriptions::created_at.desc(),
            ))
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_with_profiles(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Vec<SubscriptionWithProfileRow>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = subscriptions::table
            .left_join(profiles::table)
            .select((
                SubscriptionEntity::as_select(),
                profiles::id.nullable(),
                profiles::full_name.nullable(),
                profiles::email.nullable(),
            ))
            .into_boxed();

        if let Some(plan) = filter.plan {
            query = query.filter(subscriptions::plan.eq(plan.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(subscriptions::status.eq(status.as_str()));
        }
        if let Some(search) = filter.search_text() {
            match Uuid::parse_str(search) {
                Ok(user_id) => {
                    query = query.filter(subscriptions::user_id.eq(user_id));
                }
                Err(_) => {
                    let pattern = format!("%{}%", escape_like(search));
                    query = query.filter(
                        profiles::full_name
                            .ilike(pattern.clone())
                            .or(profiles::email.ilike(pattern)),
                    );
                }
            }
        }

        let rows = query
            .order((
                subscriptions::start_date.desc().nulls_last(),
                subscriptions::created_at.desc(),
            ))
            .load::<(SubscriptionEntity, Option<Uuid>, Option<String>, Option<String>)>(
                &mut conn,
            )?;

        Ok(rows.into_iter().map(SubscriptionWithProfileRow::from).collect())
    }

    async fn insert_pending_unless_active(&self, user_id: Uuid, plan: Plan) -> Result<PendingInsert> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = conn
                .build_transaction()
                .serializable()
                .run(|conn| guarded_pending_insert(conn, user_id, plan));

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info))
                    if attempt < SERIALIZATION_ATTEMPTS =>
                {
                    warn!(
                        %user_id,
                        %plan,
                        attempt,
                        db_error = %info.message(),
                        "subscriptions: serialization conflict in checkout guard, retrying"
                    );
                }
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                    if info.constraint_name() == Some(ONE_PENDING_PER_USER_PLAN_INDEX) =>
                {
                    // A concurrent checkout for the same plan inserted first.
                    let pending = find_pending(&mut conn, user_id, plan)?.ok_or_else(|| {
                        anyhow!("pending subscription vanished after unique violation")
                    })?;
                    return Ok(PendingInsert::ExistingPending(pending));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn activate_pending(
        &self,
        user_id: Uuid,
        plan: Plan,
        start_date: DateTime<Utc>,
    ) -> Result<ConditionalTransition> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(subscriptions::table)
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::plan.eq(plan.as_str()))
            .filter(subscriptions::status.eq(SubscriptionStatus::Pending.as_str()))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Active.as_str()),
                subscriptions::start_date.eq(start_date),
            ))
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)
            .optional();

        match result {
            Ok(Some(row)) => Ok(ConditionalTransition::Applied(row)),
            Ok(None) => Ok(ConditionalTransition::NoMatch),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some(ONE_ACTIVE_PER_USER_INDEX) =>
            {
                Ok(ConditionalTransition::ActiveConflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn cancel_active(
        &self,
        user_id: Uuid,
        plan: Plan,
        end_date: DateTime<Utc>,
    ) -> Result<ConditionalTransition> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = update(subscriptions::table)
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::plan.eq(plan.as_str()))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Canceled.as_str()),
                subscriptions::end_date.eq(end_date),
            ))
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(match row {
            Some(row) => ConditionalTransition::Applied(row),
            None => ConditionalTransition::NoMatch,
        })
    }
}
