use std::sync::Arc;

use crate::config::ServerConfig;
use crate::payments::{SslCommerzGateway, StripeGateway};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: coursemart_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Stripe Checkout client.
    pub stripe: Arc<dyn StripeGateway>,
    /// SSLCommerz gateway client.
    pub sslcommerz: Arc<dyn SslCommerzGateway>,
}
