pub mod admin_subscriptions;
pub mod cancellation;
pub mod checkout;
pub mod stripe_webhook;
pub mod subscriptions;
