use std::collections::HashMap;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::payments::stripe_client::{StripeClient, StripeEvent, WebhookVerificationError};

/// The slice of Stripe the use cases talk to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String>;

    fn construct_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookVerificationError>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String> {
        self.create_checkout_session(price_id, client_reference_id, metadata)
            .await
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookVerificationError> {
        self.construct_event(payload, signature)
    }
}
