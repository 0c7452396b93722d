//! Route definitions for courses, their curriculum and their enrollments.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{course, curriculum, enrollment};
use crate::state::AppState;

/// Routes mounted at `/courses`.
///
/// ```text
/// GET    /                                               -> list_courses (public)
/// POST   /                                               -> create_course (instructor)
/// GET    /mine                                           -> my_courses (instructor)
/// GET    /{id}                                           -> get_course (optional auth)
/// PUT    /{id}                                           -> update_course
/// DELETE /{id}                                           -> delete_course
/// PUT    /{id}/settings                                  -> update_settings
/// POST   /{id}/draft                                     -> save_draft
/// POST   /{id}/publish                                   -> publish
/// GET    /{id}/stats                                     -> course_stats
/// GET    /{id}/enrollments                               -> course_enrollments
/// POST   /{id}/modules                                   -> add_module
/// PUT    /{id}/modules/{module_id}                       -> update_module
/// DELETE /{id}/modules/{module_id}                       -> remove_module
/// POST   /{id}/modules/{module_id}/lessons               -> add_lesson
/// PUT    /{id}/modules/{module_id}/lessons/{lesson_id}   -> update_lesson
/// DELETE /{id}/modules/{module_id}/lessons/{lesson_id}   -> remove_lesson
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(course::list_courses).post(course::create_course))
        .route("/mine", get(course::my_courses))
        .route(
            "/{id}",
            get(course::get_course)
                .put(course::update_course)
                .delete(course::delete_course),
        )
        .route("/{id}/settings", put(course::update_settings))
        .route("/{id}/draft", post(course::save_draft))
        .route("/{id}/publish", post(course::publish))
        .route("/{id}/stats", get(course::course_stats))
        .route("/{id}/enrollments", get(enrollment::course_enrollments))
        .route("/{id}/modules", post(curriculum::add_module))
        .route(
            "/{id}/modules/{module_id}",
            put(curriculum::update_module).delete(curriculum::remove_module),
        )
        .route(
            "/{id}/modules/{module_id}/lessons",
            post(curriculum::add_lesson),
        )
        .route(
            "/{id}/modules/{module_id}/lessons/{lesson_id}",
            put(curriculum::update_lesson).delete(curriculum::remove_lesson),
        )
}
