use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result};
use url::Url;

use super::config_model::{
    BackendServer, Database, DotEnvyConfig, Stripe, StripePrices, Supabase,
};

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DATABASE_POOL_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STRIPE_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_STRIPE_REQUEST_TIMEOUT_SECS: u64 = 15;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup so it can be tested without touching
/// the process environment.
pub fn from_lookup<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let backend_server = BackendServer {
        port: env.parsed("SERVER_PORT_BACKEND")?,
        body_limit: env.parsed("SERVER_BODY_LIMIT")?,
        timeout: env.parsed("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: env.required("DATABASE_URL")?,
        max_connections: env
            .parsed_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
        connection_timeout: Duration::from_secs(
            env.parsed_or("DATABASE_POOL_TIMEOUT_SECS", DEFAULT_DATABASE_POOL_TIMEOUT_SECS)?,
        ),
    };

    let supabase = Supabase {
        jwt_secret: env.required("SUPABASE_JWT_SECRET")?,
    };

    let stripe = Stripe {
        secret_key: env.required("STRIPE_SECRET_KEY")?,
        webhook_secret: env.required("STRIPE_WEBHOOK_SECRET")?,
        success_url: env.url("STRIPE_SUCCESS_URL")?,
        cancel_url: env.url("STRIPE_CANCEL_URL")?,
        webhook_tolerance_secs: env.parsed_or(
            "STRIPE_WEBHOOK_TOLERANCE_SECS",
            DEFAULT_STRIPE_WEBHOOK_TOLERANCE_SECS,
        )?,
        request_timeout: Duration::from_secs(env.parsed_or(
            "STRIPE_REQUEST_TIMEOUT_SECS",
            DEFAULT_STRIPE_REQUEST_TIMEOUT_SECS,
        )?),
        prices: StripePrices {
            monthly: env.required("STRIPE_PRICE_MONTHLY")?,
            quarterly: env.required("STRIPE_PRICE_QUARTERLY")?,
            half_yearly: env.required("STRIPE_PRICE_HALF_YEARLY")?,
            yearly: env.required("STRIPE_PRICE_YEARLY")?,
        },
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        stripe,
    })
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("{key} is missing"))
    }

    fn parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.required(key)?
            .parse()
            .with_context(|| format!("{key} is invalid"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
            None => Ok(default),
        }
    }

    fn url(&self, key: &str) -> Result<Url> {
        self.parsed(key)
    }
}
