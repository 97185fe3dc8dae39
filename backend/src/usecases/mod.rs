pub mod access;
pub mod cancellation;
pub mod checkout;
pub mod errors;
pub mod payment_webhook;
pub mod stripe_gateway;
pub mod subscription_queries;
