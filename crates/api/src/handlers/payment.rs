//! Handlers for `/payments`: Stripe Checkout and SSLCommerz.
//!
//! Checkout endpoints check purchasability and open a provider session.
//! Confirmation endpoints never trust client-supplied amounts or statuses:
//! they re-fetch the session (Stripe) or re-validate the `val_id`
//! (SSLCommerz) before reconciling.

use axum::body::Bytes;
use axum::extract::{Form, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use coursemart_core::course::{self, discounted_price, format_amount, to_minor_units};
use coursemart_core::error::CoreError;
use coursemart_core::payment::{self, ssl_transaction_id};
use coursemart_core::types::DbId;
use coursemart_db::models::course::Course;
use coursemart_db::models::user::User;
use coursemart_db::repositories::{CourseRepo, EnrollmentRepo, UserRepo};

use crate::engine::reconciliation::{
    paid_from_ssl_validation, paid_from_stripe_session, reconcile_payment,
};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::payments::sslcommerz::SslInitRequest;
use crate::payments::stripe::{CheckoutRequest, StripeEvent, StripeSession, EVENT_CHECKOUT_COMPLETED};
use crate::payments::PaymentError;
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the Stripe webhook signature.
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Body of both checkout endpoints.
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub course_id: DbId,
}

/// Acknowledgement returned to provider notifications.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

async fn find_user(pool: &PgPool, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

/// Load a course and check it can be bought by `student_id` right now.
///
/// Only checked when a checkout starts; reconciliation never re-checks.
async fn purchasable_course(pool: &PgPool, course_id: DbId, student_id: DbId) -> AppResult<Course> {
    let course = CourseRepo::find_by_id(pool, course_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id: course_id,
        }))?;
    course::ensure_purchasable(course.status, course.pricing.plan, course.pricing.price)?;

    if EnrollmentRepo::find_by_pair(pool, course_id, student_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "You are already enrolled in this course".into(),
        )));
    }
    Ok(course)
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub url: String,
    pub session_id: String,
}

/// POST /api/v1/payments/stripe/checkout
pub async fn stripe_checkout(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<CheckoutInput>,
) -> AppResult<impl IntoResponse> {
    let course = purchasable_course(&state.pool, input.course_id, user.user_id).await?;
    let buyer = find_user(&state.pool, user.user_id).await?;

    let amount = discounted_price(course.pricing.price, course.pricing.discount);
    let request = CheckoutRequest {
        course_id: course.id,
        user_id: buyer.id,
        course_title: course.title,
        course_description: course.description,
        thumbnail: course.thumbnail,
        unit_amount: to_minor_units(amount)?,
        currency: state.config.payments.stripe.currency.clone(),
        customer_email: buyer.email,
        client_url: state.config.payments.client_url.clone(),
    };

    let session = state.stripe.create_checkout_session(&request).await?;
    let url = session.url.clone().ok_or_else(|| {
        PaymentError::Rejected("Stripe did not return a checkout URL".to_string())
    })?;

    tracing::info!(
        course_id = course.id,
        user_id = buyer.id,
        session_id = %session.id,
        unit_amount = request.unit_amount,
        "Stripe checkout session created",
    );

    Ok(Json(DataResponse {
        data: CheckoutSessionResponse {
            url,
            session_id: session.id,
        },
    }))
}

/// Body of `POST /payments/stripe/confirm`.
#[derive(Debug, Deserialize)]
pub struct ConfirmInput {
    pub session_id: String,
}

/// The session belongs to the caller if its metadata names them or it was
/// paid with the caller's email.
fn session_belongs_to(session: &StripeSession, user: &User) -> bool {
    let by_id = session.metadata("userId") == Some(user.id.to_string().as_str());
    let by_email = session
        .payer_email()
        .is_some_and(|email| email.eq_ignore_ascii_case(&user.email));
    by_id || by_email
}

/// POST /api/v1/payments/stripe/confirm
///
/// Called by the browser after the Checkout redirect.
pub async fn stripe_confirm(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<ConfirmInput>,
) -> AppResult<impl IntoResponse> {
    let session = state.stripe.retrieve_session(&input.session_id).await?;
    if !session.is_paid() {
        return Err(AppError::Core(CoreError::UpstreamPayment(
            "Payment not completed".into(),
        )));
    }

    let caller = find_user(&state.pool, user.user_id).await?;
    if !session_belongs_to(&session, &caller) {
        tracing::warn!(
            user_id = caller.id,
            session_id = %session.id,
            "Stripe session does not belong to caller",
        );
        return Err(AppError::Core(CoreError::Forbidden(
            "This payment does not belong to you".into(),
        )));
    }

    // The caller passed the identity check, so the caller is enrolled even
    // when only the payer email matched.
    let mut paid = paid_from_stripe_session(&session)?;
    paid.student_id = caller.id;
    let reactivate = state.config.payments.reactivate_on_payment;
    let outcome = reconcile_payment(&state.pool, &paid, reactivate).await?;

    let enrollment = EnrollmentRepo::find_with_course(&state.pool, outcome.id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Enrollment",
            id: outcome.id,
        }))?;
    Ok(Json(DataResponse { data: enrollment }))
}

/// POST /api/v1/payments/stripe/webhook
///
/// Authenticated by the `Stripe-Signature` header over the raw body.
/// Payloads that fail verification or do not describe a paid session are
/// logged and acknowledged without effect, as are events naming a course or
/// user that does not exist. Other database failures return 500 so Stripe
/// redelivers.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let stripe = &state.config.payments.stripe;
    let secret = stripe
        .webhook_secret
        .as_deref()
        .ok_or(PaymentError::NotConfigured("Stripe webhook"))?;

    let Some(signature) = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Stripe webhook without signature header");
        return Ok(Json(WebhookAck { received: false }));
    };

    if let Err(e) = payment::verify_stripe_signature(
        signature,
        &body,
        secret,
        Utc::now().timestamp(),
        stripe.webhook_tolerance_secs,
    ) {
        tracing::warn!(error = %e, "Stripe webhook signature rejected");
        return Ok(Json(WebhookAck { received: false }));
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed Stripe webhook payload");
            return Ok(Json(WebhookAck { received: false }));
        }
    };

    if event.event_type != EVENT_CHECKOUT_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring Stripe event");
        return Ok(Json(WebhookAck { received: true }));
    }

    let paid = match serde_json::from_value::<StripeSession>(event.data.object)
        .map_err(|e| CoreError::UpstreamPayment(e.to_string()))
        .and_then(|session| paid_from_stripe_session(&session))
    {
        Ok(paid) => paid,
        Err(e) => {
            tracing::warn!(event_id = %event.id, error = %e, "Stripe event not reconciled");
            return Ok(Json(WebhookAck { received: true }));
        }
    };

    match reconcile_payment(&state.pool, &paid, state.config.payments.reactivate_on_payment).await {
        Ok(_) => Ok(Json(WebhookAck { received: true })),
        Err(AppError::Core(CoreError::NotFound { entity, id })) => {
            tracing::warn!(
                event_id = %event.id,
                entity,
                id,
                "Stripe event references a missing record; acknowledged without effect",
            );
            Ok(Json(WebhookAck { received: true }))
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// SSLCommerz
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SslInitResponse {
    pub url: String,
    pub tran_id: String,
}

/// POST /api/v1/payments/ssl/init
pub async fn ssl_init(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<CheckoutInput>,
) -> AppResult<impl IntoResponse> {
    let course = purchasable_course(&state.pool, input.course_id, user.user_id).await?;
    let buyer = find_user(&state.pool, user.user_id).await?;

    let payments = &state.config.payments;
    let tran_id = ssl_transaction_id(course.id, buyer.id, Utc::now().timestamp_millis());
    let request = SslInitRequest {
        tran_id: tran_id.clone(),
        total_amount: format_amount(discounted_price(course.pricing.price, course.pricing.discount)),
        currency: payments.sslcommerz.currency.clone(),
        course_id: course.id,
        user_id: buyer.id,
        product_name: course.title,
        product_category: course.category,
        customer_name: buyer.name,
        customer_email: buyer.email,
        api_base_url: payments.api_base_url.clone(),
    };

    let session = state.sslcommerz.init_session(&request).await?;

    tracing::info!(
        course_id = course.id,
        user_id = buyer.id,
        tran_id = %tran_id,
        amount = %request.total_amount,
        "SSLCommerz session created",
    );

    Ok(Json(DataResponse {
        data: SslInitResponse {
            url: session.gateway_url,
            tran_id,
        },
    }))
}

/// Form fields SSLCommerz posts to the success, fail and IPN callbacks.
#[derive(Debug, Default, Deserialize)]
pub struct SslCallback {
    pub val_id: Option<String>,
    pub tran_id: Option<String>,
    pub status: Option<String>,
}

/// Validate the callback's `val_id` with the gateway and reconcile it.
async fn reconcile_ssl(state: &AppState, callback: &SslCallback) -> AppResult<DbId> {
    let val_id = callback
        .val_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing val_id".into()))?;

    let validation = state.sslcommerz.validate(val_id).await?;
    let paid = paid_from_ssl_validation(&validation, val_id)?;
    let outcome =
        reconcile_payment(&state.pool, &paid, state.config.payments.reactivate_on_payment).await?;
    Ok(outcome.id)
}

fn client_redirect(state: &AppState, path: &str) -> Redirect {
    Redirect::to(&format!("{}{path}", state.config.payments.client_url))
}

/// POST /api/v1/payments/ssl/success
///
/// Browser form post after payment; always answers with a redirect.
pub async fn ssl_success(
    State(state): State<AppState>,
    Form(callback): Form<SslCallback>,
) -> Redirect {
    match reconcile_ssl(&state, &callback).await {
        Ok(enrollment_id) => {
            tracing::info!(enrollment_id, tran_id = ?callback.tran_id, "SSLCommerz payment confirmed");
            client_redirect(&state, "/payment/success")
        }
        Err(e) => {
            tracing::warn!(tran_id = ?callback.tran_id, error = %e, "SSLCommerz success callback failed");
            client_redirect(&state, "/payment/cancel")
        }
    }
}

/// POST /api/v1/payments/ssl/fail
///
/// Gateway failure and cancel callbacks.
pub async fn ssl_fail(
    State(state): State<AppState>,
    Form(callback): Form<SslCallback>,
) -> Redirect {
    tracing::info!(
        tran_id = ?callback.tran_id,
        status = ?callback.status,
        "SSLCommerz payment failed or cancelled",
    );
    client_redirect(&state, "/payment/cancel")
}

/// POST /api/v1/payments/ssl/ipn
///
/// Server-to-server notification. Payments the validation API does not vouch
/// for are acknowledged without effect.
pub async fn ssl_ipn(
    State(state): State<AppState>,
    Form(callback): Form<SslCallback>,
) -> AppResult<Json<WebhookAck>> {
    match reconcile_ssl(&state, &callback).await {
        Ok(_) => Ok(Json(WebhookAck { received: true })),
        Err(AppError::Core(CoreError::UpstreamPayment(msg))) => {
            tracing::warn!(tran_id = ?callback.tran_id, error = %msg, "SSLCommerz IPN not reconciled");
            Ok(Json(WebhookAck { received: false }))
        }
        Err(AppError::Core(CoreError::NotFound { entity, id })) => {
            tracing::warn!(
                tran_id = ?callback.tran_id,
                entity,
                id,
                "SSLCommerz IPN references a missing record; acknowledged without effect",
            );
            Ok(Json(WebhookAck { received: true }))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: DbId, email: &str) -> User {
        User {
            id,
            name: "Buyer".into(),
            email: email.into(),
            role: "student".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session(user_id: &str, email: Option<&str>) -> StripeSession {
        serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "paid",
            "metadata": { "courseId": "1", "userId": user_id },
            "customer_details": { "email": email }
        }))
        .unwrap()
    }

    #[test]
    fn session_matches_by_metadata_user() {
        assert!(session_belongs_to(&session("7", None), &user(7, "a@example.com")));
    }

    #[test]
    fn session_matches_by_payer_email() {
        let s = session("99", Some("A@Example.com"));
        assert!(session_belongs_to(&s, &user(7, "a@example.com")));
    }

    #[test]
    fn foreign_session_is_rejected() {
        let s = session("99", Some("other@example.com"));
        assert!(!session_belongs_to(&s, &user(7, "a@example.com")));
    }
}
