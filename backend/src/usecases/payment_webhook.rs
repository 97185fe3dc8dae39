use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        repositories::subscriptions::{ConditionalTransition, SubscriptionRepository},
        value_objects::enums::plan_names::Plan,
    },
    payments::stripe_client::{
        CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED, CHECKOUT_SESSION_COMPLETED, StripeCheckoutSession,
        StripeClient, WebhookVerificationError,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{SubscriptionError, UseCaseResult},
    stripe_gateway::StripeGateway,
};

/// What a verified delivery did. Every variant is acknowledged to Stripe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Activated { subscription_id: Uuid },
    /// No pending row matched: a redelivery, or a session we never recorded.
    AlreadyReconciled,
    /// The user already holds another active subscription.
    ActiveConflict,
    /// Completed session still waiting for an asynchronous payment.
    AwaitingPayment,
    Ignored { event_type: String },
}

pub struct PaymentWebhookUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    stripe_client: Arc<Stripe>,
}

impl<S, Stripe> PaymentWebhookUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, stripe_client: Arc<Stripe>) -> Self {
        Self {
            subscription_repo,
            stripe_client,
        }
    }

    pub async fn handle_payment_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<WebhookOutcome> {
        let event = self
            .stripe_client
            .construct_event(payload, signature)
            .map_err(|err| match err {
                WebhookVerificationError::InvalidPayload(parse_err) => {
                    warn!(error = %parse_err, "stripe webhook: signed payload is not an event");
                    SubscriptionError::MalformedEvent(parse_err.to_string())
                }
                other => {
                    warn!(error = %other, "stripe webhook: signature verification failed");
                    SubscriptionError::InvalidSignature
                }
            })?;

        let event_id = event.id.clone().unwrap_or_default();
        info!(%event_id, event_type = %event.type_, "stripe webhook: event received");

        let event_type = event.type_.as_str();
        if event_type != CHECKOUT_SESSION_COMPLETED
            && event_type != CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED
        {
            info!(%event_id, event_type = %event.type_, "stripe webhook: event ignored");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.type_,
            });
        }

        let session = StripeClient::extract_checkout_session(&event).ok_or_else(|| {
            SubscriptionError::MalformedEvent("event data is not a checkout session".to_string())
        })?;

        if event_type == CHECKOUT_SESSION_COMPLETED && session.is_awaiting_payment() {
            info!(
                %event_id,
                session_id = ?session.id,
                "stripe webhook: checkout completed but payment is still pending"
            );
            return Ok(WebhookOutcome::AwaitingPayment);
        }

        let (user_id, plan) = correlate(&session)?;

        let transition = self
            .subscription_repo
            .activate_pending(user_id, plan, Utc::now())
            .await
            .map_err(|err| {
                error!(
                    %event_id,
                    %user_id,
                    %plan,
                    db_error = ?err,
                    "stripe webhook: failed to activate subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        let outcome = match transition {
            ConditionalTransition::Applied(row) => {
                info!(
                    %event_id,
                    %user_id,
                    %plan,
                    subscription_id = %row.id,
                    "stripe webhook: subscription activated"
                );
                WebhookOutcome::Activated {
                    subscription_id: row.id,
                }
            }
            ConditionalTransition::NoMatch => {
                info!(
                    %event_id,
                    %user_id,
                    %plan,
                    "stripe webhook: no pending subscription to activate"
                );
                WebhookOutcome::AlreadyReconciled
            }
            ConditionalTransition::ActiveConflict => {
                // Paid but refused; needs a manual refund or plan swap.
                error!(
                    %event_id,
                    %user_id,
                    %plan,
                    session_id = ?session.id,
                    "stripe webhook: payment received while another subscription is active"
                );
                WebhookOutcome::ActiveConflict
            }
        };

        Ok(outcome)
    }
}

/// The user id travels as `client_reference_id`, with `metadata.user_id` as fallback.
fn correlate(session: &StripeCheckoutSession) -> UseCaseResult<(Uuid, Plan)> {
    let raw_user_id = session
        .client_reference_id
        .as_deref()
        .filter(|value| !value.is_empty())
        .or_else(|| session.metadata_value("user_id"))
        .ok_or_else(|| {
            SubscriptionError::MalformedEvent("checkout session has no user reference".to_string())
        })?;
    let user_id = Uuid::parse_str(raw_user_id).map_err(|_| {
        SubscriptionError::MalformedEvent(format!("invalid user reference: {raw_user_id}"))
    })?;

    let raw_plan = session.metadata_value("plan").ok_or_else(|| {
        SubscriptionError::MalformedEvent("checkout session has no plan metadata".to_string())
    })?;
    let plan = raw_plan
        .parse::<Plan>()
        .map_err(|err| SubscriptionError::MalformedEvent(err.to_string()))?;

    Ok((user_id, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::stripe_gateway::MockStripeGateway;
    use crates::{
        domain::{
            entities::subscriptions::SubscriptionEntity,
            repositories::subscriptions::MockSubscriptionRepository,
        },
        payments::stripe_client::{StripeEvent, StripeEventData},
    };
    use mockall::predicate::{always, eq};
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        StripeEvent {
            id: Some("evt_test".to_string()),
            type_: event_type.to_string(),
            created: Some(1_760_000_000),
            livemode: Some(false),
            data: StripeEventData { object },
        }
    }

    fn session(user_id: Uuid, plan: &str, payment_status: &str) -> serde_json::Value {
        json!({
            "id": "cs_test_1",
            "mode": "subscription",
            "client_reference_id": user_id.to_string(),
            "payment_status": payment_status,
            "metadata": { "plan": plan, "user_id": user_id.to_string() }
        })
    }

    fn gateway_returning(event_type: &'static str, object: serde_json::Value) -> MockStripeGateway {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_construct_event()
            .returning(move |_, _| Ok(event(event_type, object.clone())));
        stripe
    }

    fn active_row(user_id: Uuid, plan: Plan) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan: plan.to_string(),
            status: "active".to_string(),
            start_date: Some(now),
            end_date: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn activates_pending_subscription_on_completed_checkout() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Yearly", "paid"));
        let mut subscription_repo = MockSubscriptionRepository::new();
        let row = active_row(user_id, Plan::Yearly);
        let row_id = row.id;

        subscription_repo
            .expect_activate_pending()
            .with(eq(user_id), eq(Plan::Yearly), always())
            .times(1)
            .returning(move |_, _, _| Ok(ConditionalTransition::Applied(row.clone())));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "t=1,v1=00").await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Activated {
                subscription_id: row_id
            }
        );
    }

    #[tokio::test]
    async fn duplicate_delivery_is_acknowledged_without_a_transition() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Monthly", "paid"));
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_activate_pending()
            .returning(|_, _, _| Ok(ConditionalTransition::NoMatch));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "sig").await.unwrap();
        assert_eq!(outcome, WebhookOutcome::AlreadyReconciled);
    }

    #[tokio::test]
    async fn invalid_signature_has_no_side_effect() {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_construct_event()
            .returning(|_, _| Err(WebhookVerificationError::SignatureMismatch));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_activate_pending().never();

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let err = usecase.handle_payment_event(b"{}", "t=1,v1=00").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidSignature));
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let stripe = gateway_returning("invoice.paid", json!({ "id": "in_1" }));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_activate_pending().never();

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "sig").await.unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "invoice.paid".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unpaid_completion_waits_for_async_payment() {
        let user_id = Uuid::new_v4();
        let stripe =
            gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Monthly", "unpaid"));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_activate_pending().never();

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "sig").await.unwrap();
        assert_eq!(outcome, WebhookOutcome::AwaitingPayment);
    }

    #[tokio::test]
    async fn async_payment_success_activates() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(
            CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED,
            session(user_id, "Quarterly", "paid"),
        );
        let mut subscription_repo = MockSubscriptionRepository::new();
        let row = active_row(user_id, Plan::Quarterly);

        subscription_repo
            .expect_activate_pending()
            .with(eq(user_id), eq(Plan::Quarterly), always())
            .times(1)
            .returning(move |_, _, _| Ok(ConditionalTransition::Applied(row.clone())));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "sig").await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Activated { .. }));
    }

    #[tokio::test]
    async fn falls_back_to_metadata_user_id() {
        let user_id = Uuid::new_v4();
        let object = json!({
            "id": "cs_test_2",
            "payment_status": "paid",
            "metadata": { "plan": "Half-Yearly", "user_id": user_id.to_string() }
        });
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, object);
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_activate_pending()
            .with(eq(user_id), eq(Plan::HalfYearly), always())
            .times(1)
            .returning(|_, _, _| Ok(ConditionalTransition::NoMatch));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        assert!(usecase.handle_payment_event(b"{}", "sig").await.is_ok());
    }

    #[tokio::test]
    async fn missing_correlation_is_malformed() {
        let object = json!({ "id": "cs_test_3", "payment_status": "paid", "metadata": { "plan": "Monthly" } });
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, object);
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_activate_pending().never();

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let err = usecase.handle_payment_event(b"{}", "sig").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::MalformedEvent(_)));
    }

    #[tokio::test]
    async fn unknown_plan_in_metadata_is_malformed() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Weekly", "paid"));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_activate_pending().never();

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let err = usecase.handle_payment_event(b"{}", "sig").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::MalformedEvent(_)));
    }

    #[tokio::test]
    async fn active_conflict_is_acknowledged() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Monthly", "paid"));
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_activate_pending()
            .returning(|_, _, _| Ok(ConditionalTransition::ActiveConflict));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let outcome = usecase.handle_payment_event(b"{}", "sig").await.unwrap();
        assert_eq!(outcome, WebhookOutcome::ActiveConflict);
    }

    #[tokio::test]
    async fn store_failure_is_internal_so_stripe_retries() {
        let user_id = Uuid::new_v4();
        let stripe = gateway_returning(CHECKOUT_SESSION_COMPLETED, session(user_id, "Monthly", "paid"));
        let mut subscription_repo = MockSubscriptionRepository::new();

        subscription_repo
            .expect_activate_pending()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

        let usecase = PaymentWebhookUseCase::new(Arc::new(subscription_repo), Arc::new(stripe));

        let err = usecase.handle_payment_event(b"{}", "sig").await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Internal(_)));
    }
}
