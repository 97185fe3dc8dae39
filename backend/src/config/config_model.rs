use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub stripe: Stripe,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: Url,
    pub cancel_url: Url,
    pub webhook_tolerance_secs: i64,
    pub request_timeout: Duration,
    pub prices: StripePrices,
}

/// Stripe price ids, one per plan.
#[derive(Debug, Clone)]
pub struct StripePrices {
    pub monthly: String,
    pub quarterly: String,
    pub half_yearly: String,
    pub yearly: String,
}
