pub mod admin;
pub mod batch;
pub mod course;
pub mod enrollment;
pub mod health;
pub mod payment;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users                                  admin provisioning, /me
///
/// /courses                                catalog, authoring, curriculum,
///                                         stats, course enrollments
///
/// /enrollments                            open enroll, assign, reads,
///                                         progress, status, rating, unenroll
///
/// /batches                                scheduling, materials,
///                                         announcements, batch enrollments
///
/// /payments/stripe/checkout|confirm|webhook
/// /payments/ssl/init|success|fail|ipn
///
/// /admin/courses/recount                  fix every drifted counter
/// /admin/courses/{id}/recount             fix one course's counter
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user::router())
        .nest("/courses", course::router())
        .nest("/enrollments", enrollment::router())
        .nest("/batches", batch::router())
        .nest("/payments", payment::router())
        .nest("/admin", admin::router())
}
