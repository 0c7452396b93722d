//! Admin maintenance handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use coursemart_core::error::CoreError;
use coursemart_core::types::DbId;
use coursemart_db::repositories::CourseRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecountResult {
    pub course_id: DbId,
    pub enrollment_count: i32,
}

#[derive(Debug, Serialize)]
pub struct RecountAllResult {
    /// Courses whose cached counter had drifted and was corrected.
    pub corrected: u64,
}

/// POST /api/v1/admin/courses/{id}/recount
///
/// Reset one course's enrollment counter from the ledger.
pub async fn recount_course(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let count = CourseRepo::recount_enrollments(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))?;

    tracing::info!(course_id = id, enrollment_count = count, admin_id = admin.user_id, "Enrollment counter recounted");

    Ok(Json(DataResponse {
        data: RecountResult {
            course_id: id,
            enrollment_count: count,
        },
    }))
}

/// POST /api/v1/admin/courses/recount
///
/// Correct every drifted counter.
pub async fn recount_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let corrected = CourseRepo::recount_all_enrollments(&state.pool).await?;

    if corrected > 0 {
        tracing::warn!(corrected, admin_id = admin.user_id, "Drifted enrollment counters corrected");
    } else {
        tracing::info!(admin_id = admin.user_id, "No drifted enrollment counters");
    }

    Ok(Json(DataResponse {
        data: RecountAllResult { corrected },
    }))
}
