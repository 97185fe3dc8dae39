use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str =
    "checkout.session.async_payment_succeeded";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    success_url: Url,
    cancel_url: Url,
    webhook_tolerance_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub client_reference_id: Option<String>,
    pub payment_status: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StripeCheckoutSession {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// `unpaid` sessions wait for `checkout.session.async_payment_succeeded`.
    pub fn is_awaiting_payment(&self) -> bool {
        self.payment_status.as_deref() == Some("unpaid")
    }
}

#[derive(Debug, Error)]
pub enum WebhookVerificationError {
    #[error("stripe-signature header is missing {0}")]
    MalformedHeader(&'static str),
    #[error("webhook timestamp is outside the tolerance window")]
    TimestampOutsideTolerance,
    #[error("no v1 signature matches the payload")]
    SignatureMismatch,
    #[error("webhook payload is not a valid stripe event: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        success_url: Url,
        cancel_url: Url,
        request_timeout: Duration,
        webhook_tolerance_secs: i64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            http,
            secret_key,
            webhook_secret,
            success_url,
            cancel_url,
            webhook_tolerance_secs,
        })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a subscription-mode Checkout Session and returns its URL.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.to_string()),
            ("cancel_url".to_string(), self.cancel_url.to_string()),
            (
                "client_reference_id".to_string(),
                client_reference_id.to_string(),
            ),
        ];

        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value));
        }

        let resp = self
            .http
            .post("https://api.stripe.com/v1/checkout/sessions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))
    }

    /// Verifies the `Stripe-Signature` header and parses the event.
    /// https://stripe.com/docs/webhooks/signatures
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> std::result::Result<StripeEvent, WebhookVerificationError> {
        self.construct_event_at(payload, signature_header, Utc::now().timestamp())
    }

    pub fn construct_event_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> std::result::Result<StripeEvent, WebhookVerificationError> {
        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<Vec<u8>> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = rest.parse().ok();
            } else if let Some(rest) = part.strip_prefix("v1=") {
                // Undecodable entries can never match; skip them.
                if let Ok(bytes) = hex::decode(rest) {
                    signatures.push(bytes);
                }
            }
        }

        let timestamp = timestamp.ok_or(WebhookVerificationError::MalformedHeader("t"))?;
        if signatures.is_empty() {
            return Err(WebhookVerificationError::MalformedHeader("v1"));
        }
        if now.abs_diff(timestamp) > self.webhook_tolerance_secs.unsigned_abs() {
            return Err(WebhookVerificationError::TimestampOutsideTolerance);
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| WebhookVerificationError::SignatureMismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures
            .iter()
            .any(|signature| mac.clone().verify_slice(signature).is_ok());
        if !matched {
            return Err(WebhookVerificationError::SignatureMismatch);
        }

        Ok(serde_json::from_slice(payload)?)
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_760_000_000;

    fn client() -> StripeClient {
        StripeClient::new(
            "sk_test".to_string(),
            SECRET.to_string(),
            Url::parse("https://app.example.com/dashboard?success=1").unwrap(),
            Url::parse("https://app.example.com/dashboard?canceled=1").unwrap(),
            Duration::from_secs(10),
            300,
        )
        .unwrap()
    }

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn payload() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": CHECKOUT_SESSION_COMPLETED,
            "data": { "object": {
                "id": "cs_test_1",
                "client_reference_id": "7b0c3f4e-6f4a-4d8e-9a55-0b3f8d2b1c11",
                "payment_status": "paid",
                "metadata": { "plan": "Monthly" }
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn accepts_valid_signature_and_parses_event() {
        let payload = payload();
        let header = format!("t={},v1={}", NOW, sign(&payload, NOW, SECRET));

        let event = client().construct_event_at(&payload, &header, NOW).unwrap();
        assert_eq!(event.type_, CHECKOUT_SESSION_COMPLETED);

        let session = StripeClient::extract_checkout_session(&event).unwrap();
        assert_eq!(session.metadata_value("plan"), Some("Monthly"));
        assert!(!session.is_awaiting_payment());
    }

    #[test]
    fn accepts_when_any_of_several_v1_signatures_matches() {
        let payload = payload();
        let header = format!(
            "t={},v1={},v1={}",
            NOW,
            sign(&payload, NOW, "whsec_rotated_out"),
            sign(&payload, NOW, SECRET)
        );

        assert!(client().construct_event_at(&payload, &header, NOW).is_ok());
    }

    #[test]
    fn rejects_signature_made_with_another_secret() {
        let payload = payload();
        let header = format!("t={},v1={}", NOW, sign(&payload, NOW, "whsec_wrong"));

        let err = client().construct_event_at(&payload, &header, NOW).unwrap_err();
        assert!(matches!(err, WebhookVerificationError::SignatureMismatch));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = payload();
        let header = format!("t={},v1={}", NOW, sign(&payload, NOW, SECRET));
        let tampered = String::from_utf8(payload)
            .unwrap()
            .replace("Monthly", "Yearly")
            .into_bytes();

        let err = client().construct_event_at(&tampered, &header, NOW).unwrap_err();
        assert!(matches!(err, WebhookVerificationError::SignatureMismatch));
    }

    #[test]
    fn rejects_timestamps_outside_tolerance() {
        let payload = payload();
        let old = NOW - 600;
        let header = format!("t={},v1={}", old, sign(&payload, old, SECRET));

        let err = client().construct_event_at(&payload, &header, NOW).unwrap_err();
        assert!(matches!(
            err,
            WebhookVerificationError::TimestampOutsideTolerance
        ));
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        let payload = payload();

        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            let err = client().construct_event_at(&payload, header, NOW).unwrap_err();
            assert!(matches!(
                err,
                WebhookVerificationError::TimestampOutsideTolerance
            ));
        }
    }

    #[test]
    fn rejects_headers_missing_parts() {
        let payload = payload();
        for header in ["", "v1=abcd", "t=1760000000", "t=abc,v1=zz"] {
            let err = client().construct_event_at(&payload, header, NOW).unwrap_err();
            assert!(
                matches!(err, WebhookVerificationError::MalformedHeader(_)),
                "unexpected error for {header:?}: {err}"
            );
        }
    }

    #[test]
    fn signed_but_non_json_payload_is_reported_as_invalid_payload() {
        let payload = b"not json".to_vec();
        let header = format!("t={},v1={}", NOW, sign(&payload, NOW, SECRET));

        let err = client().construct_event_at(&payload, &header, NOW).unwrap_err();
        assert!(matches!(err, WebhookVerificationError::InvalidPayload(_)));
    }

    #[test]
    fn unpaid_session_is_awaiting_payment() {
        let session: StripeCheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "metadata": { "plan": "" }
        }))
        .unwrap();

        assert!(session.is_awaiting_payment());
        assert_eq!(session.metadata_value("plan"), None);
    }
}
