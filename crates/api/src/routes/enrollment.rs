//! Route definitions for enrollments.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::enrollment;
use crate::state::AppState;

/// Routes mounted at `/enrollments`.
///
/// ```text
/// POST   /open                        -> enroll_open (learner)
/// POST   /assign                      -> assign (corporate admin)
/// GET    /mine                        -> my_enrollments
/// GET    /course/{course_id}/mine     -> my_enrollment_for_course
/// GET    /{id}                        -> get_enrollment
/// DELETE /{id}                        -> unenroll (student only)
/// PUT    /{id}/status                 -> update_status
/// PUT    /{id}/progress               -> mark_lesson_complete (student only)
/// GET    /{id}/progress-summary       -> progress_summary
/// POST   /{id}/rating                 -> add_rating (student only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/open", post(enrollment::enroll_open))
        .route("/assign", post(enrollment::assign))
        .route("/mine", get(enrollment::my_enrollments))
        .route(
            "/course/{course_id}/mine",
            get(enrollment::my_enrollment_for_course),
        )
        .route(
            "/{id}",
            get(enrollment::get_enrollment).delete(enrollment::unenroll),
        )
        .route("/{id}/status", put(enrollment::update_status))
        .route("/{id}/progress", put(enrollment::mark_lesson_complete))
        .route("/{id}/progress-summary", get(enrollment::progress_summary))
        .route("/{id}/rating", post(enrollment::add_rating))
}
