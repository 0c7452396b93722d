use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Payment provider credentials and redirect targets.
    pub payments: PaymentConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            payments: PaymentConfig::from_env(),
        }
    }
}

/// Stripe credentials. The provider is disabled when `secret_key` is unset.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    /// Lower-case ISO code sent to Stripe (default: `usd`).
    pub currency: String,
    pub api_base: String,
    /// Maximum age of a webhook signature timestamp.
    pub webhook_tolerance_secs: i64,
}

/// SSLCommerz credentials. The provider is disabled when either credential
/// is unset.
#[derive(Debug, Clone)]
pub struct SslCommerzConfig {
    pub store_id: Option<String>,
    pub store_pass: Option<String>,
    pub sandbox: bool,
    /// ISO code sent to SSLCommerz (default: `BDT`).
    pub currency: String,
}

impl SslCommerzConfig {
    pub fn base_url(&self) -> &'static str {
        if self.sandbox {
            "https://sandbox.sslcommerz.com"
        } else {
            "https://securepay.sslcommerz.com"
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Front-end origin used for checkout redirects.
    pub client_url: String,
    /// Public origin of this API, used for provider callback URLs.
    pub api_base_url: String,
    pub stripe: StripeConfig,
    pub sslcommerz: SslCommerzConfig,
    /// When set, a recorded payment moves a cancelled or paused enrollment
    /// back to `active`.
    pub reactivate_on_payment: bool,
}

/// Default Stripe webhook signature tolerance in seconds.
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl PaymentConfig {
    /// Load payment configuration from environment variables.
    ///
    /// | Env Var                          | Default                     |
    /// |----------------------------------|-----------------------------|
    /// | `CLIENT_URL`                     | `http://localhost:5173`     |
    /// | `API_BASE_URL`                   | `http://localhost:3000`     |
    /// | `STRIPE_SECRET_KEY`              | -- (Stripe disabled)        |
    /// | `STRIPE_WEBHOOK_SECRET`          | -- (webhook rejected)       |
    /// | `STRIPE_CURRENCY`                | `usd`                       |
    /// | `STRIPE_API_BASE`                | `https://api.stripe.com`    |
    /// | `STRIPE_WEBHOOK_TOLERANCE_SECS`  | `300`                       |
    /// | `SSLCZ_STORE_ID`                 | -- (SSLCommerz disabled)    |
    /// | `SSLCZ_STORE_PASS`               | -- (SSLCommerz disabled)    |
    /// | `SSLCZ_MODE`                     | `sandbox`                   |
    /// | `SSLCZ_CURRENCY`                 | `BDT`                       |
    /// | `PAYMENT_REACTIVATES_ENROLLMENT` | `false`                     |
    pub fn from_env() -> Self {
        let client_url = std::env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let webhook_tolerance_secs: i64 = std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
            .unwrap_or_else(|_| DEFAULT_WEBHOOK_TOLERANCE_SECS.to_string())
            .parse()
            .expect("STRIPE_WEBHOOK_TOLERANCE_SECS must be a valid i64");

        let stripe = StripeConfig {
            secret_key: optional_env("STRIPE_SECRET_KEY"),
            webhook_secret: optional_env("STRIPE_WEBHOOK_SECRET"),
            currency: std::env::var("STRIPE_CURRENCY")
                .unwrap_or_else(|_| "usd".into())
                .to_ascii_lowercase(),
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into())
                .trim_end_matches('/')
                .to_string(),
            webhook_tolerance_secs,
        };

        let mode = std::env::var("SSLCZ_MODE").unwrap_or_else(|_| "sandbox".into());
        assert!(
            mode == "sandbox" || mode == "live",
            "SSLCZ_MODE must be 'sandbox' or 'live'"
        );

        let sslcommerz = SslCommerzConfig {
            store_id: optional_env("SSLCZ_STORE_ID"),
            store_pass: optional_env("SSLCZ_STORE_PASS"),
            sandbox: mode == "sandbox",
            currency: std::env::var("SSLCZ_CURRENCY")
                .unwrap_or_else(|_| "BDT".into())
                .to_ascii_uppercase(),
        };

        let reactivate_on_payment = std::env::var("PAYMENT_REACTIVATES_ENROLLMENT")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            client_url,
            api_base_url,
            stripe,
            sslcommerz,
            reactivate_on_payment,
        }
    }
}
