use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    Admin,
    #[default]
    User,
}

impl Display for ProfileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            ProfileRole::Admin => "admin",
            ProfileRole::User => "user",
        };
        write!(f, "{}", role)
    }
}

impl ProfileRole {
    /// Anything other than `admin` is treated as a regular user.
    pub fn from_db_value(value: &str) -> Self {
        match value.trim() {
            "admin" => ProfileRole::Admin,
            _ => ProfileRole::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == ProfileRole::Admin
    }
}
