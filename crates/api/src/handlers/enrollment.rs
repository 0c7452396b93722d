//! Handlers for the `/enrollments` resource.
//!
//! Mutations delegate to [`crate::engine::enrollment`]; reads go straight to
//! the repository.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use coursemart_core::enrollment::{self, EnrollmentStatus};
use coursemart_core::error::CoreError;
use coursemart_core::pagination::Pagination;
use coursemart_core::types::DbId;
use coursemart_db::models::enrollment::{
    AddRating, AssignEmployees, MarkLessonComplete, UpdateEnrollmentStatus,
};
use coursemart_db::repositories::{CourseRepo, EnrollmentRepo};

use crate::engine::enrollment as engine;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCorporateAdmin, RequireLearner};
use crate::query::PageParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// Default page size for the caller's own enrollments.
const MY_ENROLLMENTS_PAGE_SIZE: i64 = 10;

/// Default page size for a course's enrollment list.
const COURSE_ENROLLMENTS_PAGE_SIZE: i64 = 20;

/// `?status=active,completed&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentListParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl EnrollmentListParams {
    pub(crate) fn statuses(&self) -> Result<Vec<EnrollmentStatus>, CoreError> {
        match self.status.as_deref() {
            Some(raw) => enrollment::parse_status_filter(raw),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn page(&self, default_limit: i64) -> (i64, i64, i64) {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
        .resolve(default_limit)
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Body of `POST /enrollments/open`.
#[derive(Debug, Deserialize)]
pub struct OpenEnrollmentInput {
    pub course_id: DbId,
    /// Join this batch of the course as well.
    pub batch_id: Option<DbId>,
}

/// POST /api/v1/enrollments/open
pub async fn enroll_open(
    RequireLearner(user): RequireLearner,
    State(state): State<AppState>,
    Json(input): Json<OpenEnrollmentInput>,
) -> AppResult<impl IntoResponse> {
    let enrollment =
        engine::create_open_enrollment(&state.pool, input.course_id, user.user_id, input.batch_id)
            .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: enrollment })))
}

/// POST /api/v1/enrollments/assign
///
/// Partial success is still 201; callers must inspect `errors`.
pub async fn assign(
    RequireCorporateAdmin(user): RequireCorporateAdmin,
    State(state): State<AppState>,
    Json(input): Json<AssignEmployees>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let report = engine::assign_employees(&state.pool, &input, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/enrollments/mine
pub async fn my_enrollments(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<EnrollmentListParams>,
) -> AppResult<impl IntoResponse> {
    let statuses = params.statuses()?;
    let (page, limit, offset) = params.page(MY_ENROLLMENTS_PAGE_SIZE);

    let enrollments =
        EnrollmentRepo::list_for_student(&state.pool, user.user_id, &statuses, limit, offset)
            .await?;
    let total = EnrollmentRepo::count_for_student(&state.pool, user.user_id, &statuses).await?;

    Ok(Json(PagedResponse {
        data: enrollments,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/v1/enrollments/course/{course_id}/mine
///
/// The caller's active or completed enrollment, or `null`.
pub async fn my_enrollment_for_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let enrollment = EnrollmentRepo::find_for_student_course(
        &state.pool,
        course_id,
        user.user_id,
        EnrollmentStatus::COUNTED,
    )
    .await?;
    Ok(Json(DataResponse { data: enrollment }))
}

/// GET /api/v1/enrollments/{id}
pub async fn get_enrollment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = EnrollmentRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Enrollment",
            id,
        }))?;
    enrollment::ensure_student_or_manager(detail.enrollment.student_id, user.user_id, &user.role)?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/courses/{id}/enrollments
pub async fn course_enrollments(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
    Query(params): Query<EnrollmentListParams>,
) -> AppResult<impl IntoResponse> {
    let course = CourseRepo::find_by_id(&state.pool, course_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id: course_id,
        }))?;
    enrollment::ensure_course_viewer(course.owner_id, user.user_id, &user.role)?;

    let statuses = params.statuses()?;
    let (page, limit, offset) = params.page(COURSE_ENROLLMENTS_PAGE_SIZE);

    let enrollments =
        EnrollmentRepo::list_for_course(&state.pool, course_id, &statuses, limit, offset).await?;
    let total = EnrollmentRepo::count_for_course(&state.pool, course_id, &statuses).await?;

    Ok(Json(PagedResponse {
        data: enrollments,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/v1/enrollments/{id}/progress-summary
pub async fn progress_summary(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let summary = engine::progress_summary(&state.pool, id, user.user_id, &user.role).await?;
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// PUT /api/v1/enrollments/{id}/progress
pub async fn mark_lesson_complete(
    RequireLearner(user): RequireLearner,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<MarkLessonComplete>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let progress = engine::mark_lesson_complete(&state.pool, id, user.user_id, &input).await?;
    Ok(Json(DataResponse { data: progress }))
}

/// PUT /api/v1/enrollments/{id}/status
pub async fn update_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEnrollmentStatus>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let updated = engine::update_status(&state.pool, id, user.user_id, &user.role, &input).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/enrollments/{id}
///
/// Soft unenroll: the row stays, with status `cancelled`.
pub async fn unenroll(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    engine::unenroll(&state.pool, id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/enrollments/{id}/rating
pub async fn add_rating(
    RequireLearner(user): RequireLearner,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddRating>,
) -> AppResult<impl IntoResponse> {
    enrollment::validate_rating(input.rating)?;
    input.validate()?;
    let updated = engine::add_rating(&state.pool, id, user.user_id, &input).await?;
    Ok(Json(DataResponse { data: updated }))
}
