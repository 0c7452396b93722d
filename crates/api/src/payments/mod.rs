//! Payment provider clients.
//!
//! Each provider sits behind an object-safe trait so handlers can be driven
//! by in-process fakes in tests. The real clients talk HTTP via `reqwest`.
//!
//! - [`stripe`] -- hosted Checkout sessions and webhook event types.
//! - [`sslcommerz`] -- gateway session init and the validation API.

pub mod sslcommerz;
pub mod stripe;

use async_trait::async_trait;

use self::sslcommerz::{SslInitRequest, SslSession, SslValidation};
use self::stripe::{CheckoutRequest, StripeSession};

/// Failure talking to a payment provider.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Credentials for the provider are missing from the environment.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The provider answered but refused the request.
    #[error("Payment provider rejected the request: {0}")]
    Rejected(String),

    /// Non-2xx response from the provider.
    #[error("Payment provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    /// Network, TLS or decode failure.
    #[error("Payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Stripe Checkout operations used by the payment flows.
#[async_trait]
pub trait StripeGateway: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeSession, PaymentError>;

    /// Re-fetch a checkout session by id. Client-supplied status is never
    /// trusted; this is the source of truth.
    async fn retrieve_session(&self, session_id: &str) -> Result<StripeSession, PaymentError>;
}

/// SSLCommerz operations used by the payment flows.
#[async_trait]
pub trait SslCommerzGateway: Send + Sync {
    /// Open a gateway session and return the hosted page URL.
    async fn init_session(&self, request: &SslInitRequest) -> Result<SslSession, PaymentError>;

    /// Ask the validation API about a `val_id` posted back by the gateway.
    async fn validate(&self, val_id: &str) -> Result<SslValidation, PaymentError>;
}
