use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{entities::profiles::ProfileEntity, repositories::profiles::ProfileRepository},
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::profiles},
};

pub struct ProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilePostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<ProfileEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let profile = profiles::table
            .filter(profiles::id.eq(user_id))
            .select(ProfileEntity::as_select())
            .first::<ProfileEntity>(&mut conn)
            .optional()?;

        Ok(profile)
    }
}
