use std::sync::Arc;

use anyhow::Result;
use backend::{axum_http::http_serve, config::config_loader};
use crates::{
    domain::value_objects::plans::PlanCatalog,
    infra::db::postgres::postgres_connection,
    payments::stripe_client::StripeClient,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
        dotenvy_env.database.connection_timeout,
    )?;
    info!("Postgres connection has been established");

    let stripe = &dotenvy_env.stripe;
    let stripe_client = StripeClient::new(
        stripe.secret_key.clone(),
        stripe.webhook_secret.clone(),
        stripe.success_url.clone(),
        stripe.cancel_url.clone(),
        stripe.request_timeout,
        stripe.webhook_tolerance_secs,
    )?;

    let catalog = PlanCatalog::new(
        stripe.prices.monthly.clone(),
        stripe.prices.quarterly.clone(),
        stripe.prices.half_yearly.clone(),
        stripe.prices.yearly.clone(),
    );

    http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        Arc::new(stripe_client),
        Arc::new(catalog),
    )
    .await?;

    Ok(())
}
