//! Handlers for course modules and lessons.
//!
//! All endpoints are scoped under `/courses/{id}/modules` and require the
//! course owner or an admin. Any change that can add or remove a lesson
//! recomputes the course total duration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sqlx::PgPool;
use validator::Validate;
use coursemart_core::course;
use coursemart_core::error::CoreError;
use coursemart_core::types::DbId;
use coursemart_db::models::lesson::{CreateLesson, UpdateLesson};
use coursemart_db::models::module::{CourseModule, CreateModule, UpdateModule};
use coursemart_db::repositories::{CourseRepo, LessonRepo, ModuleRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::course::find_managed_course;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn module_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Module",
        id,
    })
}

fn lesson_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Lesson",
        id,
    })
}

async fn find_module(pool: &PgPool, course_id: DbId, module_id: DbId) -> AppResult<CourseModule> {
    ModuleRepo::find_in_course(pool, course_id, module_id)
        .await?
        .ok_or_else(|| module_not_found(module_id))
}

/// Recompute and store the course's total video duration.
async fn refresh_total_duration(pool: &PgPool, course_id: DbId) -> AppResult<()> {
    let lessons = LessonRepo::list_for_course(pool, course_id).await?;
    let total = course::total_duration(
        lessons
            .iter()
            .map(|l| (l.lesson_type, l.duration.as_str())),
    );
    CourseRepo::set_total_duration(pool, course_id, &total).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/modules
pub async fn add_module(
    user: AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
    Json(input): Json<CreateModule>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    find_managed_course(&state.pool, course_id, &user).await?;

    let module = ModuleRepo::create(&state.pool, course_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: module })))
}

/// PUT /api/v1/courses/{id}/modules/{module_id}
pub async fn update_module(
    user: AuthUser,
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateModule>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    find_managed_course(&state.pool, course_id, &user).await?;

    let module = ModuleRepo::update(&state.pool, course_id, module_id, &input)
        .await?
        .ok_or_else(|| module_not_found(module_id))?;
    Ok(Json(DataResponse { data: module }))
}

/// DELETE /api/v1/courses/{id}/modules/{module_id}
///
/// The module's lessons are removed with it.
pub async fn remove_module(
    user: AuthUser,
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    find_managed_course(&state.pool, course_id, &user).await?;

    if !ModuleRepo::delete(&state.pool, course_id, module_id).await? {
        return Err(module_not_found(module_id));
    }
    refresh_total_duration(&state.pool, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lessons
// ---------------------------------------------------------------------------

/// POST /api/v1/courses/{id}/modules/{module_id}/lessons
pub async fn add_lesson(
    user: AuthUser,
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateLesson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(duration) = &input.duration {
        course::validate_lesson_duration(duration)?;
    }
    find_managed_course(&state.pool, course_id, &user).await?;
    find_module(&state.pool, course_id, module_id).await?;

    let lesson = LessonRepo::create(&state.pool, module_id, &input).await?;
    refresh_total_duration(&state.pool, course_id).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: lesson })))
}

/// PUT /api/v1/courses/{id}/modules/{module_id}/lessons/{lesson_id}
pub async fn update_lesson(
    user: AuthUser,
    State(state): State<AppState>,
    Path((course_id, module_id, lesson_id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<UpdateLesson>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(duration) = &input.duration {
        course::validate_lesson_duration(duration)?;
    }
    find_managed_course(&state.pool, course_id, &user).await?;
    find_module(&state.pool, course_id, module_id).await?;

    let lesson = LessonRepo::update(&state.pool, module_id, lesson_id, &input)
        .await?
        .ok_or_else(|| lesson_not_found(lesson_id))?;
    refresh_total_duration(&state.pool, course_id).await?;

    Ok(Json(DataResponse { data: lesson }))
}

/// DELETE /api/v1/courses/{id}/modules/{module_id}/lessons/{lesson_id}
pub async fn remove_lesson(
    user: AuthUser,
    State(state): State<AppState>,
    Path((course_id, module_id, lesson_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    find_managed_course(&state.pool, course_id, &user).await?;
    find_module(&state.pool, course_id, module_id).await?;

    if !LessonRepo::delete(&state.pool, module_id, lesson_id).await? {
        return Err(lesson_not_found(lesson_id));
    }
    refresh_total_duration(&state.pool, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
