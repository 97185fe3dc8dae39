pub mod enums;
pub mod plans;
pub mod subscription_reports;
pub mod subscriptions;
