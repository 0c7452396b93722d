use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST /courses/recount          -> recount_all
/// POST /courses/{id}/recount     -> recount_course
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/courses/recount", post(admin::recount_all))
        .route("/courses/{id}/recount", post(admin::recount_course))
}
