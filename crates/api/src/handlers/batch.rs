//! Handlers for the `/batches` resource: scheduled cohorts of a course.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;
use coursemart_core::batch::BatchStatus;
use coursemart_core::error::CoreError;
use coursemart_core::pagination::Pagination;
use coursemart_core::types::DbId;
use coursemart_db::models::batch::{
    BatchDetail, BatchFilter, BatchView, CreateBatch, CreateBatchAnnouncement,
    CreateBatchMaterial, UpdateBatch,
};
use coursemart_db::repositories::{BatchRepo, EnrollmentRepo};

use crate::engine::batch as engine;
use crate::error::{AppError, AppResult};
use crate::handlers::enrollment::EnrollmentListParams;
use crate::middleware::rbac::RequireInstructor;
use crate::query::PageParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// Default page size for the batch list.
const BATCHES_PAGE_SIZE: i64 = 10;

/// Default page size for a batch's enrollment list.
const BATCH_ENROLLMENTS_PAGE_SIZE: i64 = 20;

/// Query parameters for `GET /batches`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchListParams {
    pub course_id: Option<DbId>,
    pub status: Option<BatchStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/batches
pub async fn list_batches(
    State(state): State<AppState>,
    Query(params): Query<BatchListParams>,
) -> AppResult<impl IntoResponse> {
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(BATCHES_PAGE_SIZE);
    let filter = BatchFilter {
        course_id: params.course_id,
        status: params.status,
    };

    let now = Utc::now();
    let batches = BatchRepo::list(&state.pool, &filter, limit, offset)
        .await?
        .into_iter()
        .map(|b| BatchView::at(b, now))
        .collect::<Vec<_>>();
    let total = BatchRepo::count(&state.pool, &filter).await?;

    Ok(Json(PagedResponse {
        data: batches,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/v1/batches/{id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = engine::load_view(&state.pool, id).await?;
    let materials = BatchRepo::list_materials(&state.pool, id).await?;
    let announcements = BatchRepo::list_announcements(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: BatchDetail {
            view,
            materials,
            announcements,
        },
    }))
}

/// POST /api/v1/batches
pub async fn create_batch(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Json(input): Json<CreateBatch>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let created = engine::create_batch(&state.pool, &user, &input).await?;
    let view = engine::load_view(&state.pool, created.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// PATCH /api/v1/batches/{id}
pub async fn update_batch(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateBatch>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    engine::update_batch(&state.pool, id, &user, &input).await?;
    let view = engine::load_view(&state.pool, id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/batches/{id}
pub async fn delete_batch(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    engine::remove_batch(&state.pool, id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/batches/{id}/materials
pub async fn add_material(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateBatchMaterial>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    engine::find_managed_batch(&state.pool, id, &user).await?;
    let material = BatchRepo::add_material(&state.pool, id, user.user_id, &input).await?;
    tracing::info!(batch_id = id, material_id = material.id, "Batch material added");
    Ok((StatusCode::CREATED, Json(DataResponse { data: material })))
}

/// POST /api/v1/batches/{id}/announcements
pub async fn add_announcement(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateBatchAnnouncement>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Title and content are required".into(),
        )));
    }
    engine::find_managed_batch(&state.pool, id, &user).await?;
    let announcement = BatchRepo::add_announcement(&state.pool, id, user.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: announcement })))
}

/// GET /api/v1/batches/{id}/enrollments
///
/// Accepts the same `status`, `page` and `limit` parameters as the other
/// enrollment lists.
pub async fn batch_enrollments(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<EnrollmentListParams>,
) -> AppResult<impl IntoResponse> {
    engine::find_managed_batch(&state.pool, id, &user).await?;

    let statuses = params.statuses()?;
    let (page, limit, offset) = params.page(BATCH_ENROLLMENTS_PAGE_SIZE);

    let enrollments =
        EnrollmentRepo::list_for_batch(&state.pool, id, &statuses, limit, offset).await?;
    let total = EnrollmentRepo::count_for_batch(&state.pool, id, &statuses).await?;

    Ok(Json(PagedResponse {
        data: enrollments,
        pagination: Pagination::new(page, limit, total),
    }))
}
