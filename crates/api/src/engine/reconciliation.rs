//! Payment reconciliation.
//!
//! Stripe confirm, the Stripe webhook, SSLCommerz success and the SSLCommerz
//! IPN all funnel into [`reconcile_payment`]. Providers deliver at least
//! once, so the upsert is safe to repeat; only the last payment's fields
//! survive.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use coursemart_core::course::from_minor_units;
use coursemart_core::enrollment::EnrollmentStatus;
use coursemart_core::error::CoreError;
use coursemart_core::payment::{
    is_valid_ssl_status, normalize_currency, parse_metadata_id, PaidEnrollment, PaymentMethod,
};
use coursemart_db::models::enrollment::UpsertOutcome;
use coursemart_db::repositories::{CourseRepo, EnrollmentRepo, UserRepo};

use crate::error::{is_foreign_key_violation, AppError, AppResult};
use crate::payments::sslcommerz::SslValidation;
use crate::payments::stripe::StripeSession;

/// Record a provider-confirmed payment against the (course, student) pair.
///
/// A new row bumps the course counter. With `reactivate`, a cancelled or
/// paused row goes back to `active`; a reactivated cancellation also
/// restores the count that unenroll took away.
///
/// A course or student that does not exist is `CoreError::NotFound`, so
/// callbacks can tell a payload that will never reconcile from a transient
/// database failure.
pub async fn reconcile_payment(
    pool: &PgPool,
    paid: &PaidEnrollment,
    reactivate: bool,
) -> AppResult<UpsertOutcome> {
    if CourseRepo::find_by_id(pool, paid.course_id).await?.is_none() {
        return Err(not_found("Course", paid.course_id));
    }
    if UserRepo::find_by_id(pool, paid.student_id).await?.is_none() {
        return Err(not_found("User", paid.student_id));
    }

    let outcome = match EnrollmentRepo::upsert_paid(pool, paid, reactivate).await {
        Ok(outcome) => outcome,
        // Course or user deleted since the lookup.
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(not_found("Course", paid.course_id));
        }
        Err(e) => return Err(e.into()),
    };

    let previous = outcome
        .previous_status
        .as_deref()
        .and_then(|s| s.parse::<EnrollmentStatus>().ok());
    let restored = reactivate && previous == Some(EnrollmentStatus::Cancelled);

    if outcome.inserted || restored {
        if let Err(e) = CourseRepo::adjust_enrollment_count(pool, paid.course_id, 1).await {
            tracing::error!(
                course_id = paid.course_id,
                enrollment_id = outcome.id,
                error = %e,
                "Failed to bump enrollment counter after payment",
            );
            return Err(e.into());
        }
    }

    if !reactivate && previous.is_some_and(EnrollmentStatus::reactivates_on_payment) {
        tracing::warn!(
            enrollment_id = outcome.id,
            status = ?previous,
            "Payment recorded on an inactive enrollment; status left unchanged",
        );
    }

    tracing::info!(
        enrollment_id = outcome.id,
        course_id = paid.course_id,
        student_id = paid.student_id,
        method = %paid.method,
        transaction_id = %paid.transaction_id,
        amount = %paid.amount,
        inserted = outcome.inserted,
        "Payment reconciled",
    );

    Ok(outcome)
}

fn not_found(entity: &'static str, id: i64) -> AppError {
    AppError::Core(CoreError::NotFound { entity, id })
}

/// Normalize a re-fetched Stripe checkout session.
///
/// The session must be paid and carry `courseId`/`userId` metadata.
pub fn paid_from_stripe_session(session: &StripeSession) -> Result<PaidEnrollment, CoreError> {
    if !session.is_paid() {
        return Err(CoreError::UpstreamPayment(
            "Payment not completed".to_string(),
        ));
    }
    Ok(PaidEnrollment {
        course_id: parse_metadata_id(session.metadata("courseId"), "courseId")?,
        student_id: parse_metadata_id(session.metadata("userId"), "userId")?,
        amount: from_minor_units(session.amount_total.unwrap_or(0)),
        currency: normalize_currency(session.currency.as_deref()),
        method: PaymentMethod::Stripe,
        transaction_id: session.transaction_id().to_string(),
    })
}

/// Normalize an SSLCommerz validation answer for `val_id`.
///
/// The status must be `VALID` or `VALIDATED`; course and user ids come from
/// `value_a` and `value_b`.
pub fn paid_from_ssl_validation(
    validation: &SslValidation,
    val_id: &str,
) -> Result<PaidEnrollment, CoreError> {
    if !is_valid_ssl_status(&validation.status) {
        return Err(CoreError::UpstreamPayment(format!(
            "Payment validation failed with status {}",
            validation.status
        )));
    }
    let amount = match validation.amount.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Decimal::from_str(raw).map_err(|_| {
            CoreError::UpstreamPayment(format!("Invalid amount '{raw}' in payment validation"))
        })?,
        _ => Decimal::ZERO,
    };
    Ok(PaidEnrollment {
        course_id: parse_metadata_id(validation.value_a.as_deref(), "courseId")?,
        student_id: parse_metadata_id(validation.value_b.as_deref(), "userId")?,
        amount,
        currency: normalize_currency(validation.currency.as_deref()),
        method: PaymentMethod::SslCommerz,
        transaction_id: val_id.to_string(),
    })
}
