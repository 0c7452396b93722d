//! Stripe Checkout client and wire types.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use coursemart_core::types::DbId;

use super::{PaymentError, StripeGateway};
use crate::config::StripeConfig;

/// HTTP request timeout for a single Stripe API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Event type that carries a finished checkout session.
pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// `payment_status` of a session whose funds were captured.
pub const PAYMENT_STATUS_PAID: &str = "paid";

/// Everything needed to open a one-item checkout session for a course.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub course_id: DbId,
    pub user_id: DbId,
    pub course_title: String,
    pub course_description: String,
    pub thumbnail: Option<String>,
    /// Amount in minor units (cents).
    pub unit_amount: i64,
    /// Lower-case ISO currency.
    pub currency: String,
    pub customer_email: String,
    pub client_url: String,
}

impl CheckoutRequest {
    pub fn success_url(&self) -> String {
        format!(
            "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.client_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/payment/cancel", self.client_url)
    }

    /// Form body in Stripe's bracketed-key encoding.
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                self.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                self.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                self.course_title.clone(),
            ),
            ("customer_email".into(), self.customer_email.clone()),
            ("metadata[courseId]".into(), self.course_id.to_string()),
            ("metadata[userId]".into(), self.user_id.to_string()),
            ("success_url".into(), self.success_url()),
            ("cancel_url".into(), self.cancel_url()),
        ];
        if !self.course_description.is_empty() {
            let description: String = self.course_description.chars().take(500).collect();
            form.push((
                "line_items[0][price_data][product_data][description]".into(),
                description,
            ));
        }
        if let Some(thumbnail) = &self.thumbnail {
            form.push((
                "line_items[0][price_data][product_data][images][0]".into(),
                thumbnail.clone(),
            ));
        }
        form
    }
}

/// The subset of a Stripe Checkout Session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: String,
    /// Payment intent id (unexpanded).
    pub payment_intent: Option<String>,
    /// Minor units.
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

impl StripeSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAYMENT_STATUS_PAID
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Email the customer paid with, preferring the details Stripe collected.
    pub fn payer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    /// Payment intent id, or the session id when Stripe has none.
    pub fn transaction_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

/// A webhook event envelope. `data.object` is decoded per event type.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Stripe REST client.
pub struct StripeClient {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    fn secret_key(&self) -> Result<&str, PaymentError> {
        self.config
            .secret_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured("Stripe"))
    }

    async fn read_session(response: reqwest::Response) -> Result<StripeSession, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<StripeSession>().await?)
    }
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeSession, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&request.form())
            .send()
            .await?;
        Self::read_session(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<StripeSession, PaymentError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.config.api_base
            ))
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;
        Self::read_session(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            course_id: 7,
            user_id: 3,
            course_title: "Rust".into(),
            course_description: String::new(),
            thumbnail: None,
            unit_amount: 4000,
            currency: "usd".into(),
            customer_email: "a@example.com".into(),
            client_url: "http://localhost:5173".into(),
        }
    }

    #[test]
    fn success_url_keeps_stripe_placeholder() {
        assert_eq!(
            request().success_url(),
            "http://localhost:5173/payment/success?session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn form_carries_metadata_and_amount() {
        let form = request().form();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("metadata[courseId]"), Some("7"));
        assert_eq!(get("metadata[userId]"), Some("3"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("4000"));
        assert_eq!(get("line_items[0][price_data][product_data][images][0]"), None);
    }

    #[test]
    fn session_decodes_from_stripe_json() {
        let json = serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": null,
            "payment_status": "paid",
            "payment_intent": "pi_123",
            "amount_total": 4000,
            "currency": "usd",
            "metadata": { "courseId": "7", "userId": "3" },
            "customer_email": null,
            "customer_details": { "email": "a@example.com", "name": "A" }
        });
        let session: StripeSession = serde_json::from_value(json).unwrap();
        assert!(session.is_paid());
        assert_eq!(session.transaction_id(), "pi_123");
        assert_eq!(session.payer_email(), Some("a@example.com"));
        assert_eq!(session.metadata("courseId"), Some("7"));
    }

    #[test]
    fn transaction_id_falls_back_to_session() {
        let json = serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "payment_intent": null
        });
        let session: StripeSession = serde_json::from_value(json).unwrap();
        assert!(!session.is_paid());
        assert_eq!(session.transaction_id(), "cs_test_2");
    }
}
