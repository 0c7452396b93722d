mod common;

use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::PgPool;

use common::*;
use coursemart_core::course::{EnrollmentType, Visibility};
use coursemart_core::payment::compute_stripe_signature;

// ---------------------------------------------------------------------------
// Stripe checkout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn checkout_charges_discounted_price(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(10)).await;
    let app = TestApp::new(pool);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/checkout",
        &token(buyer, "student"),
        json!({ "course_id": course }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["data"]["url"].as_str().unwrap().starts_with("https://"));
    assert!(body["data"]["session_id"].is_string());

    let created = app.stripe.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].unit_amount, 3600);
    assert_eq!(created[0].currency, "usd");
    assert_eq!(created[0].customer_email, "buyer@example.com");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn checkout_rejects_free_course(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_course(&pool, owner, EnrollmentType::Open, Visibility::Public).await;
    let app = TestApp::new(pool);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/checkout",
        &token(buyer, "student"),
        json!({ "course_id": course }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(app.stripe.created().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn checkout_rejects_existing_enrollment(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool);
    app.stripe.insert(paid_session("cs_first", course, buyer, "pi_first", 4000));

    let t = token(buyer, "student");
    let resp = post_json_auth(app.router(), "/api/v1/payments/stripe/confirm", &t, json!({ "session_id": "cs_first" })).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_json_auth(app.router(), "/api/v1/payments/stripe/checkout", &t, json!({ "course_id": course })).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Stripe confirm
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_records_payment_and_enrolls(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    app.stripe.insert(paid_session("cs_1", course, buyer, "pi_1", 4000));

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(buyer, "student"),
        json!({ "session_id": "cs_1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["payment"]["amount"], 40.0);
    assert_eq!(body["data"]["payment"]["currency"], "USD");
    assert_eq!(body["data"]["payment"]["method"], "stripe");
    assert_eq!(body["data"]["payment"]["transaction_id"], "pi_1");
    assert!(body["data"]["payment"]["paid_at"].is_string());
    assert_eq!(body["data"]["course"]["id"], course);
    assert_eq!(enrollment_count(&pool, course).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn later_payment_overwrites_receipt(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    app.stripe.insert(paid_session("cs_1", course, buyer, "pi_1", 4000));
    app.stripe.insert(paid_session("cs_2", course, buyer, "pi_2", 3500));
    let t = token(buyer, "student");

    post_json_auth(app.router(), "/api/v1/payments/stripe/confirm", &t, json!({ "session_id": "cs_1" })).await;
    let resp = post_json_auth(app.router(), "/api/v1/payments/stripe/confirm", &t, json!({ "session_id": "cs_2" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["payment"]["transaction_id"], "pi_2");
    assert_eq!(body["data"]["payment"]["amount"], 35.0);

    // One row per pair, counted once.
    assert_eq!(enrollment_count(&pool, course).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_rejects_unpaid_session(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    let mut session = paid_session("cs_open", course, buyer, "pi_open", 4000);
    session.payment_status = "unpaid".to_string();
    app.stripe.insert(session);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(buyer, "student"),
        json!({ "session_id": "cs_open" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(enrollment_count(&pool, course).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_rejects_someone_elses_session(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let intruder = create_user(&pool, "intruder@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    app.stripe.insert(paid_session("cs_1", course, buyer, "pi_1", 4000));

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(intruder, "student"),
        json!({ "session_id": "cs_1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "This payment does not belong to you");
    assert_eq!(enrollment_count(&pool, course).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_matched_by_email_enrolls_the_caller(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let caller = create_user(&pool, "caller@example.com", "student").await;
    let other = create_user(&pool, "other@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    // Metadata names another account; the payer email is the caller's.
    let mut session = paid_session("cs_mail", course, other, "pi_mail", 4000);
    session.customer_details = None;
    session.customer_email = Some("CALLER@example.com".to_string());
    app.stripe.insert(session);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(caller, "student"),
        json!({ "session_id": "cs_mail" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["student_id"], caller);

    let resp = get_auth(
        app.router(),
        &format!("/api/v1/enrollments/course/{course}/mine"),
        &token(other, "student"),
    )
    .await;
    assert!(body_json(resp).await["data"].is_null());
    assert_eq!(enrollment_count(&pool, course).await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_unknown_session_is_upstream_error(pool: PgPool) {
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let app = TestApp::new(pool);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(buyer, "student"),
        json!({ "session_id": "cs_missing" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

// ---------------------------------------------------------------------------
// Reactivation
// ---------------------------------------------------------------------------

async fn cancelled_enrollment(app: &TestApp, course: i64, buyer: i64) {
    let t = token(buyer, "student");
    let resp = post_json_auth(app.router(), "/api/v1/enrollments/open", &t, json!({ "course_id": course })).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = body_json(resp).await["data"]["id"].as_i64().unwrap();
    let resp = delete_auth(app.router(), &format!("/api/v1/enrollments/{id}"), &t).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_keeps_cancelled_status_by_default(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    cancelled_enrollment(&app, course, buyer).await;
    app.stripe.insert(paid_session("cs_1", course, buyer, "pi_1", 4000));

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(buyer, "student"),
        json!({ "session_id": "cs_1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["payment"]["transaction_id"], "pi_1");
    assert_eq!(enrollment_count(&pool, course).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn payment_reactivates_when_configured(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let mut config = test_config();
    config.payments.reactivate_on_payment = true;
    let app = TestApp::with_config(pool.clone(), config);
    cancelled_enrollment(&app, course, buyer).await;
    app.stripe.insert(paid_session("cs_1", course, buyer, "pi_1", 4000));

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/stripe/confirm",
        &token(buyer, "student"),
        json!({ "session_id": "cs_1" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["data"]["status"], "active");
    assert_eq!(enrollment_count(&pool, course).await, 1);
}

// ---------------------------------------------------------------------------
// Stripe webhook
// ---------------------------------------------------------------------------

fn completed_event(course: i64, buyer: i64) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_hook",
                "payment_status": "paid",
                "payment_intent": "pi_hook",
                "amount_total": 4000,
                "currency": "usd",
                "metadata": { "courseId": course.to_string(), "userId": buyer.to_string() }
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn signature(payload: &[u8]) -> String {
    let t = Utc::now().timestamp();
    format!("t={t},v1={}", compute_stripe_signature(WEBHOOK_SECRET, t, payload))
}

#[sqlx::test(migrations = "../db/migrations")]
async fn signed_webhook_enrolls_buyer(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    let payload = completed_event(course, buyer);

    let resp = post_raw(
        app.router(),
        "/api/v1/payments/stripe/webhook",
        &[("stripe-signature", signature(&payload))],
        payload,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
    assert_eq!(enrollment_count(&pool, course).await, 1);

    let resp = get_auth(
        app.router(),
        &format!("/api/v1/enrollments/course/{course}/mine"),
        &token(buyer, "student"),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["data"]["payment"]["transaction_id"], "pi_hook");
}

async fn enrollment_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_for_missing_course_is_acknowledged(pool: PgPool) {
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let app = TestApp::new(pool.clone());
    let payload = completed_event(999_999, buyer);

    let resp = post_raw(
        app.router(),
        "/api/v1/payments/stripe/webhook",
        &[("stripe-signature", signature(&payload))],
        payload,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
    assert_eq!(enrollment_rows(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_for_missing_user_is_acknowledged(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    let payload = completed_event(course, 999_999);

    let resp = post_raw(
        app.router(),
        "/api/v1/payments/stripe/webhook",
        &[("stripe-signature", signature(&payload))],
        payload,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
    assert_eq!(enrollment_count(&pool, course).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_with_bad_signature_is_ignored(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    let payload = completed_event(course, buyer);
    let t = Utc::now().timestamp();
    let forged = format!("t={t},v1={}", compute_stripe_signature("whsec_wrong", t, &payload));

    let resp = post_raw(
        app.router(),
        "/api/v1/payments/stripe/webhook",
        &[("stripe-signature", forged)],
        payload.clone(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], false);

    let resp = post_raw(app.router(), "/api/v1/payments/stripe/webhook", &[], payload).await;
    assert_eq!(body_json(resp).await["received"], false);

    assert_eq!(enrollment_count(&pool, course).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_ignores_other_event_types(pool: PgPool) {
    let app = TestApp::new(pool);
    let payload = json!({
        "id": "evt_2",
        "type": "payment_intent.created",
        "data": { "object": {} }
    })
    .to_string()
    .into_bytes();

    let resp = post_raw(
        app.router(),
        "/api/v1/payments/stripe/webhook",
        &[("stripe-signature", signature(&payload))],
        payload,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_without_secret_is_unavailable(pool: PgPool) {
    let mut config = test_config();
    config.payments.stripe.webhook_secret = None;
    let app = TestApp::with_config(pool, config);

    let resp = post_raw(app.router(), "/api/v1/payments/stripe/webhook", &[], b"{}".to_vec()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// SSLCommerz
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn ssl_init_opens_gateway_session(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(10)).await;
    let app = TestApp::new(pool);

    let resp = post_json_auth(
        app.router(),
        "/api/v1/payments/ssl/init",
        &token(buyer, "student"),
        json!({ "course_id": course }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let tran_id = body["data"]["tran_id"].as_str().unwrap();
    assert!(tran_id.starts_with(&format!("course_{course}_{buyer}_")));
    assert!(body["data"]["url"].as_str().unwrap().contains(tran_id));

    let inits = app.ssl.inits();
    assert_eq!(inits[0].total_amount, "36.00");
    assert_eq!(inits[0].currency, "BDT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ssl_ipn_reconciles_validated_payment(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    app.ssl.insert("val_ok", valid_ssl(course, buyer, "40.00"));

    let resp = post_form(app.router(), "/api/v1/payments/ssl/ipn", "val_id=val_ok&tran_id=t1&status=VALID").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
    assert_eq!(enrollment_count(&pool, course).await, 1);

    let resp = get_auth(
        app.router(),
        &format!("/api/v1/enrollments/course/{course}/mine"),
        &token(buyer, "student"),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["data"]["payment"]["method"], "sslcommerz");
    assert_eq!(body["data"]["payment"]["transaction_id"], "val_ok");
    assert_eq!(body["data"]["payment"]["amount"], 40.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ssl_ipn_ignores_unvalidated_payment(pool: PgPool) {
    let app = TestApp::new(pool);

    let resp = post_form(app.router(), "/api/v1/payments/ssl/ipn", "val_id=val_bogus").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], false);

    let resp = post_form(app.router(), "/api/v1/payments/ssl/ipn", "tran_id=t1").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ssl_ipn_for_missing_course_is_acknowledged(pool: PgPool) {
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let app = TestApp::new(pool.clone());
    app.ssl.insert("val_gone", valid_ssl(999_999, buyer, "40.00"));

    let resp = post_form(app.router(), "/api/v1/payments/ssl/ipn", "val_id=val_gone").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["received"], true);
    assert_eq!(enrollment_rows(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn ssl_success_redirects_to_client(pool: PgPool) {
    let owner = create_user(&pool, "owner@example.com", "instructor").await;
    let buyer = create_user(&pool, "buyer@example.com", "student").await;
    let course = create_paid_course(&pool, owner, dec!(40), dec!(0)).await;
    let app = TestApp::new(pool.clone());
    app.ssl.insert("val_ok", valid_ssl(course, buyer, "40.00"));

    let resp = post_form(app.router(), "/api/v1/payments/ssl/success", "val_id=val_ok").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()["location"],
        "http://localhost:5173/payment/success"
    );
    assert_eq!(enrollment_count(&pool, course).await, 1);

    let resp = post_form(app.router(), "/api/v1/payments/ssl/success", "val_id=val_bogus").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "http://localhost:5173/payment/cancel");

    let resp = post_form(app.router(), "/api/v1/payments/ssl/fail", "tran_id=t1&status=FAILED").await;
    assert_eq!(resp.headers()["location"], "http://localhost:5173/payment/cancel");
}
