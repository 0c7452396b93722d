//! Route definitions for payment providers.

use axum::routing::post;
use axum::Router;

use crate::handlers::payment;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /stripe/checkout    -> stripe_checkout (auth)
/// POST /stripe/confirm     -> stripe_confirm (auth)
/// POST /stripe/webhook     -> stripe_webhook (signature)
/// POST /ssl/init           -> ssl_init (auth)
/// POST /ssl/success        -> ssl_success (gateway form post, redirects)
/// POST /ssl/fail           -> ssl_fail (gateway form post, redirects)
/// POST /ssl/ipn            -> ssl_ipn (gateway notification)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stripe/checkout", post(payment::stripe_checkout))
        .route("/stripe/confirm", post(payment::stripe_confirm))
        .route("/stripe/webhook", post(payment::stripe_webhook))
        .route("/ssl/init", post(payment::ssl_init))
        .route("/ssl/success", post(payment::ssl_success))
        .route("/ssl/fail", post(payment::ssl_fail))
        .route("/ssl/ipn", post(payment::ssl_ipn))
}
