use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::profiles;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileEntity {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
}
