#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::ServiceExt;

use coursemart_api::auth::jwt::{generate_access_token, JwtConfig};
use coursemart_api::config::{PaymentConfig, ServerConfig, SslCommerzConfig, StripeConfig};
use coursemart_api::payments::sslcommerz::{SslInitRequest, SslSession, SslValidation};
use coursemart_api::payments::stripe::{CheckoutRequest, CustomerDetails, StripeSession};
use coursemart_api::payments::{PaymentError, SslCommerzGateway, StripeGateway};
use coursemart_api::router::build_app_router;
use coursemart_api::state::AppState;
use coursemart_core::course::{CourseStatus, EnrollmentType, LessonType, PricingPlan, Visibility};
use coursemart_core::types::DbId;
use coursemart_db::models::course::{CreateCourse, UpdateCourseSettings};
use coursemart_db::models::lesson::CreateLesson;
use coursemart_db::models::module::CreateModule;
use coursemart_db::models::user::CreateUser;
use coursemart_db::repositories::{CourseRepo, LessonRepo, ModuleRepo, UserRepo};

pub const JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Build a test `ServerConfig` with safe defaults and both payment
/// providers configured.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
        payments: PaymentConfig {
            client_url: "http://localhost:5173".to_string(),
            api_base_url: "http://localhost:3000".to_string(),
            stripe: StripeConfig {
                secret_key: Some("sk_test_fake".to_string()),
                webhook_secret: Some(WEBHOOK_SECRET.to_string()),
                currency: "usd".to_string(),
                api_base: "http://stripe.invalid".to_string(),
                webhook_tolerance_secs: 300,
            },
            sslcommerz: SslCommerzConfig {
                store_id: Some("teststore".to_string()),
                store_pass: Some("testpass".to_string()),
                sandbox: true,
                currency: "BDT".to_string(),
            },
            reactivate_on_payment: false,
        },
    }
}

// ---------------------------------------------------------------------------
// Fake payment providers
// ---------------------------------------------------------------------------

/// In-memory Stripe. Sessions created through checkout, or seeded by a
/// test, can be retrieved by id.
#[derive(Default)]
pub struct FakeStripe {
    sessions: Mutex<HashMap<String, StripeSession>>,
    created: Mutex<Vec<CheckoutRequest>>,
    next_id: AtomicU64,
}

impl FakeStripe {
    pub fn insert(&self, session: StripeSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn created(&self) -> Vec<CheckoutRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl StripeGateway for FakeStripe {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeSession, PaymentError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        let session = StripeSession {
            id: id.clone(),
            url: Some(format!("https://checkout.stripe.test/{id}")),
            payment_status: "unpaid".to_string(),
            payment_intent: None,
            amount_total: Some(request.unit_amount),
            currency: Some(request.currency.clone()),
            metadata: HashMap::from([
                ("courseId".to_string(), request.course_id.to_string()),
                ("userId".to_string(), request.user_id.to_string()),
            ]),
            customer_email: Some(request.customer_email.clone()),
            customer_details: None,
        };
        self.created.lock().unwrap().push(request.clone());
        self.insert(session.clone());
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<StripeSession, PaymentError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(PaymentError::Provider {
                status: 404,
                body: format!("No such checkout.session: {session_id}"),
            })
    }
}

/// A paid session for `course_id` bought by `user_id`.
pub fn paid_session(
    id: &str,
    course_id: DbId,
    user_id: DbId,
    payment_intent: &str,
    amount_total: i64,
) -> StripeSession {
    StripeSession {
        id: id.to_string(),
        url: None,
        payment_status: "paid".to_string(),
        payment_intent: Some(payment_intent.to_string()),
        amount_total: Some(amount_total),
        currency: Some("usd".to_string()),
        metadata: HashMap::from([
            ("courseId".to_string(), course_id.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ]),
        customer_email: None,
        customer_details: Some(CustomerDetails { email: None }),
    }
}

/// In-memory SSLCommerz validation API keyed by `val_id`.
#[derive(Default)]
pub struct FakeSsl {
    validations: Mutex<HashMap<String, SslValidation>>,
    inits: Mutex<Vec<SslInitRequest>>,
}

impl FakeSsl {
    pub fn insert(&self, val_id: &str, validation: SslValidation) {
        self.validations
            .lock()
            .unwrap()
            .insert(val_id.to_string(), validation);
    }

    pub fn inits(&self) -> Vec<SslInitRequest> {
        self.inits.lock().unwrap().clone()
    }
}

#[async_trait]
impl SslCommerzGateway for FakeSsl {
    async fn init_session(&self, request: &SslInitRequest) -> Result<SslSession, PaymentError> {
        self.inits.lock().unwrap().push(request.clone());
        Ok(SslSession {
            gateway_url: format!("https://sandbox.sslcommerz.test/pay/{}", request.tran_id),
        })
    }

    async fn validate(&self, val_id: &str) -> Result<SslValidation, PaymentError> {
        Ok(self
            .validations
            .lock()
            .unwrap()
            .get(val_id)
            .cloned()
            .unwrap_or(SslValidation {
                status: "INVALID_TRANSACTION".to_string(),
                tran_id: None,
                val_id: Some(val_id.to_string()),
                amount: None,
                currency: None,
                value_a: None,
                value_b: None,
            }))
    }
}

pub fn valid_ssl(course_id: DbId, user_id: DbId, amount: &str) -> SslValidation {
    SslValidation {
        status: "VALID".to_string(),
        tran_id: Some(format!("course_{course_id}_{user_id}_1")),
        val_id: None,
        amount: Some(amount.to_string()),
        currency: Some("BDT".to_string()),
        value_a: Some(course_id.to_string()),
        value_b: Some(user_id.to_string()),
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A test application with handles on its fake providers.
pub struct TestApp {
    pub pool: PgPool,
    pub config: ServerConfig,
    pub stripe: Arc<FakeStripe>,
    pub ssl: Arc<FakeSsl>,
}

impl TestApp {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, test_config())
    }

    pub fn with_config(pool: PgPool, config: ServerConfig) -> Self {
        Self {
            pool,
            config,
            stripe: Arc::new(FakeStripe::default()),
            ssl: Arc::new(FakeSsl::default()),
        }
    }

    /// A fresh router sharing this app's pool and fakes.
    pub fn router(&self) -> Router {
        let state = AppState {
            pool: self.pool.clone(),
            config: Arc::new(self.config.clone()),
            stripe: self.stripe.clone(),
            sslcommerz: self.ssl.clone(),
        };
        build_app_router(state, &self.config)
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This is the same router construction `main.rs` uses, so integration tests
/// exercise the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    TestApp::new(pool).router()
}

pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            role: Some(role.to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

pub fn course_input(title: &str) -> CreateCourse {
    CreateCourse {
        title: title.to_string(),
        description: Some("Learn by building".to_string()),
        category: "Other".to_string(),
        tags: None,
        audience: None,
        thumbnail: None,
        difficulty: None,
        language: None,
        prerequisites: None,
        objectives: None,
        pricing_plan: None,
        price: None,
        discount: None,
        visibility: None,
        enrollment_type: None,
    }
}

/// A published course with the given enrollment type and visibility.
pub async fn create_course(
    pool: &PgPool,
    owner_id: DbId,
    enrollment_type: EnrollmentType,
    visibility: Visibility,
) -> DbId {
    let course = CourseRepo::create(pool, owner_id, &course_input("Rust Basics"))
        .await
        .unwrap();
    CourseRepo::update_settings(
        pool,
        course.id,
        &UpdateCourseSettings {
            pricing_plan: None,
            price: None,
            discount: None,
            visibility: Some(visibility),
            enrollment_type: Some(enrollment_type),
        },
    )
    .await
    .unwrap();
    CourseRepo::set_status(pool, course.id, CourseStatus::Published)
        .await
        .unwrap();
    course.id
}

/// A published, public, paid course.
pub async fn create_paid_course(
    pool: &PgPool,
    owner_id: DbId,
    price: Decimal,
    discount: Decimal,
) -> DbId {
    let id = create_course(pool, owner_id, EnrollmentType::Open, Visibility::Public).await;
    CourseRepo::update_settings(
        pool,
        id,
        &UpdateCourseSettings {
            pricing_plan: Some(PricingPlan::Paid),
            price: Some(price),
            discount: Some(discount),
            visibility: None,
            enrollment_type: None,
        },
    )
    .await
    .unwrap();
    id
}

/// Add one module holding `count` ten-minute video lessons. Returns the
/// lesson ids in order.
pub async fn add_lessons(pool: &PgPool, course_id: DbId, count: usize) -> Vec<DbId> {
    let module = ModuleRepo::create(
        pool,
        course_id,
        &CreateModule {
            name: format!("Module {}", ModuleRepo::count_for_course(pool, course_id).await.unwrap() + 1),
        },
    )
    .await
    .unwrap();

    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let lesson = LessonRepo::create(
            pool,
            module.id,
            &CreateLesson {
                title: format!("Lesson {}", i + 1),
                description: None,
                lesson_type: Some(LessonType::Video),
                duration: Some("10:00".to_string()),
                file_url: None,
                external_link: None,
            },
        )
        .await
        .unwrap();
        ids.push(lesson.id);
    }
    ids
}

pub async fn enrollment_count(pool: &PgPool, course_id: DbId) -> i32 {
    CourseRepo::find_by_id(pool, course_id)
        .await
        .unwrap()
        .unwrap()
        .enrollment_count
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(t) => builder.header("authorization", format!("Bearer {t}")),
        None => builder,
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    with_auth(Request::builder().method(method).uri(uri), token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method(method).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request("GET", uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request("GET", uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request("POST", uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("POST", uri, Some(token), body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request("POST", uri, Some(token))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("PUT", uri, Some(token), body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request("PATCH", uri, Some(token), body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request("DELETE", uri, Some(token))).await
}

/// POST an `application/x-www-form-urlencoded` body.
pub async fn post_form(app: Router, uri: &str, form: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a raw body with extra headers (webhooks).
pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, String)],
    body: Vec<u8>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
