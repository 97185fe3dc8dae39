pub mod plan_names;
pub mod profile_roles;
pub mod subscription_statuses;
