//! SSLCommerz gateway client and wire types.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use coursemart_core::types::DbId;

use super::{PaymentError, SslCommerzGateway};
use crate::config::SslCommerzConfig;

/// HTTP request timeout for a single SSLCommerz API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything needed to open a gateway session for one course purchase.
#[derive(Debug, Clone)]
pub struct SslInitRequest {
    pub tran_id: String,
    /// Two-decimal amount string (`"40.00"`).
    pub total_amount: String,
    pub currency: String,
    pub course_id: DbId,
    pub user_id: DbId,
    pub product_name: String,
    pub product_category: String,
    pub customer_name: String,
    pub customer_email: String,
    /// Public origin of this API; callback paths are appended to it.
    pub api_base_url: String,
}

impl SslInitRequest {
    fn callback(&self, kind: &str) -> String {
        format!("{}/api/v1/payments/ssl/{kind}", self.api_base_url)
    }

    fn form(&self, store_id: &str, store_pass: &str) -> Vec<(&'static str, String)> {
        vec![
            ("store_id", store_id.to_string()),
            ("store_passwd", store_pass.to_string()),
            ("total_amount", self.total_amount.clone()),
            ("currency", self.currency.clone()),
            ("tran_id", self.tran_id.clone()),
            ("success_url", self.callback("success")),
            ("fail_url", self.callback("fail")),
            ("cancel_url", self.callback("fail")),
            ("ipn_url", self.callback("ipn")),
            ("product_name", self.product_name.clone()),
            ("product_category", self.product_category.clone()),
            ("product_profile", "non-physical-goods".to_string()),
            ("shipping_method", "NO".to_string()),
            ("num_of_item", "1".to_string()),
            ("cus_name", self.customer_name.clone()),
            ("cus_email", self.customer_email.clone()),
            // Mandatory on the gateway side; not collected by this service.
            ("cus_add1", "N/A".to_string()),
            ("cus_city", "N/A".to_string()),
            ("cus_country", "Bangladesh".to_string()),
            ("cus_phone", "N/A".to_string()),
            ("value_a", self.course_id.to_string()),
            ("value_b", self.user_id.to_string()),
        ]
    }
}

/// A successfully opened gateway session.
#[derive(Debug, Clone)]
pub struct SslSession {
    pub gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    status: String,
    #[serde(rename = "GatewayPageURL")]
    gateway_page_url: Option<String>,
    failedreason: Option<String>,
}

/// Validation API answer for a `val_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SslValidation {
    pub status: String,
    pub tran_id: Option<String>,
    pub val_id: Option<String>,
    /// Two-decimal amount string as charged.
    pub amount: Option<String>,
    pub currency: Option<String>,
    /// Course id set at init.
    pub value_a: Option<String>,
    /// User id set at init.
    pub value_b: Option<String>,
}

/// SSLCommerz REST client.
pub struct SslCommerzClient {
    client: reqwest::Client,
    config: SslCommerzConfig,
}

impl SslCommerzClient {
    pub fn new(config: SslCommerzConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    fn credentials(&self) -> Result<(&str, &str), PaymentError> {
        match (&self.config.store_id, &self.config.store_pass) {
            (Some(id), Some(pass)) => Ok((id, pass)),
            _ => Err(PaymentError::NotConfigured("SSLCommerz")),
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PaymentError::Provider {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SslCommerzGateway for SslCommerzClient {
    async fn init_session(&self, request: &SslInitRequest) -> Result<SslSession, PaymentError> {
        let (store_id, store_pass) = self.credentials()?;
        let response = self
            .client
            .post(format!("{}/gwprocess/v4/api.php", self.config.base_url()))
            .form(&request.form(store_id, store_pass))
            .send()
            .await?;
        let body: InitResponse = Self::check_status(response).await?.json().await?;

        match (body.status.as_str(), body.gateway_page_url) {
            ("SUCCESS", Some(url)) if !url.is_empty() => Ok(SslSession { gateway_url: url }),
            _ => Err(PaymentError::Rejected(
                body.failedreason
                    .unwrap_or_else(|| "Failed to create payment session".to_string()),
            )),
        }
    }

    async fn validate(&self, val_id: &str) -> Result<SslValidation, PaymentError> {
        let (store_id, store_pass) = self.credentials()?;
        let response = self
            .client
            .get(format!(
                "{}/validator/api/validationserverAPI.php",
                self.config.base_url()
            ))
            .query(&[
                ("val_id", val_id),
                ("store_id", store_id),
                ("store_passwd", store_pass),
                ("format", "json"),
            ])
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_form_routes_callbacks_to_api() {
        let request = SslInitRequest {
            tran_id: "course_1_2_3".into(),
            total_amount: "40.00".into(),
            currency: "BDT".into(),
            course_id: 1,
            user_id: 2,
            product_name: "Rust".into(),
            product_category: "Other".into(),
            customer_name: "A".into(),
            customer_email: "a@example.com".into(),
            api_base_url: "http://localhost:3000".into(),
        };
        let form = request.form("store", "pass");
        let get = |k: &str| form.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(
            get("ipn_url"),
            Some("http://localhost:3000/api/v1/payments/ssl/ipn")
        );
        assert_eq!(get("value_a"), Some("1"));
        assert_eq!(get("value_b"), Some("2"));
        assert_eq!(get("total_amount"), Some("40.00"));
    }

    #[test]
    fn validation_decodes_gateway_json() {
        let json = serde_json::json!({
            "status": "VALID",
            "tran_id": "course_1_2_3",
            "val_id": "v123",
            "amount": "40.00",
            "currency": "BDT",
            "value_a": "1",
            "value_b": "2",
            "bank_tran_id": "ignored"
        });
        let v: SslValidation = serde_json::from_value(json).unwrap();
        assert_eq!(v.status, "VALID");
        assert_eq!(v.value_a.as_deref(), Some("1"));
    }
}
