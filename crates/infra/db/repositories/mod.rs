pub mod profiles;
pub mod subscriptions;
