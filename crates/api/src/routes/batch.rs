//! Route definitions for batches.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::batch;
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// GET    /                    -> list_batches
/// POST   /                    -> create_batch (instructor)
/// GET    /{id}                -> get_batch
/// PATCH  /{id}                -> update_batch (mentor or admin)
/// DELETE /{id}                -> delete_batch (mentor or admin)
/// POST   /{id}/materials      -> add_material
/// POST   /{id}/announcements  -> add_announcement
/// GET    /{id}/enrollments    -> batch_enrollments
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(batch::list_batches).post(batch::create_batch))
        .route(
            "/{id}",
            get(batch::get_batch)
                .patch(batch::update_batch)
                .delete(batch::delete_batch),
        )
        .route("/{id}/materials", post(batch::add_material))
        .route("/{id}/announcements", post(batch::add_announcement))
        .route("/{id}/enrollments", get(batch::batch_enrollments))
}
