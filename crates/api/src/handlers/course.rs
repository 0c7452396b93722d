//! Handlers for the `/courses` resource: catalog, authoring and stats.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;
use coursemart_core::course::{
    self, Audience, CourseStatus, Difficulty, PricingPlan, Visibility,
};
use coursemart_core::enrollment::EnrollmentStatus;
use coursemart_core::error::CoreError;
use coursemart_core::pagination::Pagination;
use coursemart_core::types::DbId;
use coursemart_db::models::course::{
    Course, CourseDetail, CourseFilter, CourseSort, CreateCourse, UpdateCourse,
    UpdateCourseSettings,
};
use coursemart_db::models::enrollment::EnrollmentWithStudent;
use coursemart_db::models::module::ModuleWithLessons;
use coursemart_db::repositories::{CourseRepo, EnrollmentRepo, LessonRepo, ModuleRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, OptionalAuthUser};
use crate::middleware::rbac::RequireInstructor;
use crate::query::PageParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// Default catalog page size.
const CATALOG_PAGE_SIZE: i64 = 12;

/// Default page size for an instructor's own course list.
const MY_COURSES_PAGE_SIZE: i64 = 10;

/// Enrollments shown in the stats panel.
const RECENT_ENROLLMENTS: i64 = 10;

/// Load a course the caller may modify (owner or admin).
pub async fn find_managed_course(
    pool: &PgPool,
    course_id: DbId,
    user: &AuthUser,
) -> AppResult<Course> {
    let course = CourseRepo::find_by_id(pool, course_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id: course_id,
        }))?;
    if !user.can_manage(course.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only modify your own courses".into(),
        )));
    }
    Ok(course)
}

async fn load_detail(pool: &PgPool, course: Course) -> AppResult<CourseDetail> {
    let modules = ModuleRepo::list_for_course(pool, course.id).await?;
    let lessons = LessonRepo::list_for_course(pool, course.id).await?;
    Ok(CourseDetail {
        course,
        modules: ModuleWithLessons::group(modules, lessons),
    })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Query parameters for `GET /courses`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub plan: Option<PricingPlan>,
    pub audience: Option<Audience>,
    pub difficulty: Option<Difficulty>,
    /// Comma-separated; a course matches if it has any of them.
    pub tags: Option<String>,
    pub status: Option<CourseStatus>,
    pub sort_by: Option<CourseSort>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CatalogParams {
    fn filter(&self) -> CourseFilter {
        let tags = self.tags.as_deref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        });
        CourseFilter {
            search: self.q.clone().filter(|q| !q.trim().is_empty()),
            category: self.category.clone(),
            plan: self.plan,
            audience: self.audience,
            difficulty: self.difficulty,
            tags: tags.filter(|t| !t.is_empty()),
            status: self.status,
        }
    }
}

/// GET /api/v1/courses
///
/// Public catalog of visible courses (published unless `status` is given).
pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> AppResult<impl IntoResponse> {
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(CATALOG_PAGE_SIZE);
    let filter = params.filter();
    let descending = !params
        .sort_order
        .as_deref()
        .is_some_and(|o| o.eq_ignore_ascii_case("asc"));

    let courses = CourseRepo::list_catalog(
        &state.pool,
        &filter,
        params.sort_by.unwrap_or_default(),
        descending,
        limit,
        offset,
    )
    .await?;
    let total = CourseRepo::count_catalog(&state.pool, &filter).await?;

    Ok(Json(PagedResponse {
        data: courses,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Query parameters for `GET /courses/mine`.
#[derive(Debug, Default, Deserialize)]
pub struct MyCoursesParams {
    pub status: Option<CourseStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/courses/mine
pub async fn my_courses(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Query(params): Query<MyCoursesParams>,
) -> AppResult<impl IntoResponse> {
    let (page, limit, offset) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(MY_COURSES_PAGE_SIZE);

    let courses =
        CourseRepo::list_by_owner(&state.pool, user.user_id, params.status, limit, offset).await?;
    let total = CourseRepo::count_by_owner(&state.pool, user.user_id, params.status).await?;

    Ok(Json(PagedResponse {
        data: courses,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/v1/courses/{id}
///
/// Public + published courses are open to anyone. Owners and admins always
/// see their course. A private course needs an active or completed
/// enrollment of the caller.
pub async fn get_course(
    OptionalAuthUser(user): OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let course = CourseRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))?;

    if !course::is_publicly_readable(course.visibility, course.status) {
        let Some(user) = user else {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Login required".into(),
            )));
        };
        if !user.can_manage(course.owner_id) {
            if course.visibility != Visibility::Private {
                return Err(AppError::Core(CoreError::Forbidden("Access denied".into())));
            }
            let enrolled = EnrollmentRepo::find_for_student_course(
                &state.pool,
                course.id,
                user.user_id,
                EnrollmentStatus::COUNTED,
            )
            .await?;
            if enrolled.is_none() {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Access denied: You are not enrolled in this private course".into(),
                )));
            }
        }
    }

    let detail = load_detail(&state.pool, course).await?;
    Ok(Json(DataResponse { data: detail }))
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

fn validate_pricing(
    price: Option<rust_decimal::Decimal>,
    discount: Option<rust_decimal::Decimal>,
) -> Result<(), CoreError> {
    if let Some(price) = price {
        course::validate_price(price)?;
    }
    if let Some(discount) = discount {
        course::validate_discount(discount)?;
    }
    Ok(())
}

/// POST /api/v1/courses
pub async fn create_course(
    RequireInstructor(user): RequireInstructor,
    State(state): State<AppState>,
    Json(input): Json<CreateCourse>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    course::validate_category(&input.category)?;
    validate_pricing(input.price, input.discount)?;

    let created = CourseRepo::create(&state.pool, user.user_id, &input).await?;

    tracing::info!(course_id = created.id, owner_id = user.user_id, "Course created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// PUT /api/v1/courses/{id}
pub async fn update_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCourse>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(category) = &input.category {
        course::validate_category(category)?;
    }
    find_managed_course(&state.pool, id, &user).await?;

    let updated = CourseRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))?;
    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/v1/courses/{id}/settings
///
/// Pricing, visibility and enrollment type.
pub async fn update_settings(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCourseSettings>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_pricing(input.price, input.discount)?;
    find_managed_course(&state.pool, id, &user).await?;

    let updated = CourseRepo::update_settings(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))?;
    Ok(Json(DataResponse { data: updated }))
}

async fn set_status(
    state: &AppState,
    id: DbId,
    status: CourseStatus,
) -> AppResult<Course> {
    let updated = CourseRepo::set_status(&state.pool, id, status)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }))?;
    tracing::info!(course_id = id, status = %status, "Course status changed");
    Ok(updated)
}

/// POST /api/v1/courses/{id}/draft
pub async fn save_draft(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_managed_course(&state.pool, id, &user).await?;
    let updated = set_status(&state, id, CourseStatus::Draft).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/courses/{id}/publish
pub async fn publish(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let course = find_managed_course(&state.pool, id, &user).await?;
    let module_count = ModuleRepo::count_for_course(&state.pool, id).await?;
    course::ensure_publishable(&course.title, &course.description, module_count)?;

    let updated = set_status(&state, id, CourseStatus::Published).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/courses/{id}
///
/// Modules, lessons and enrollments go with it.
pub async fn delete_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_managed_course(&state.pool, id, &user).await?;
    if !CourseRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id,
        }));
    }
    tracing::info!(course_id = id, user_id = user.user_id, "Course deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CourseStats {
    /// Live count of active and completed enrollments.
    pub enrollment_count: i64,
    pub completed_count: i64,
    /// Percentage of counted enrollments that are completed, 2 decimals.
    pub completion_rate: f64,
    pub recent_enrollments: Vec<EnrollmentWithStudent>,
}

fn completion_rate(completed: i64, counted: i64) -> f64 {
    if counted <= 0 {
        return 0.0;
    }
    (completed as f64 / counted as f64 * 10_000.0).round() / 100.0
}

/// GET /api/v1/courses/{id}/stats
pub async fn course_stats(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_managed_course(&state.pool, id, &user).await?;

    let enrollment_count =
        EnrollmentRepo::count_for_course(&state.pool, id, EnrollmentStatus::COUNTED).await?;
    let completed_count =
        EnrollmentRepo::count_for_course(&state.pool, id, &[EnrollmentStatus::Completed]).await?;
    let recent_enrollments =
        EnrollmentRepo::list_for_course(&state.pool, id, &[], RECENT_ENROLLMENTS, 0).await?;

    Ok(Json(DataResponse {
        data: CourseStats {
            enrollment_count,
            completed_count,
            completion_rate: completion_rate(completed_count, enrollment_count),
            recent_enrollments,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_has_two_decimals() {
        assert_eq!(completion_rate(1, 3), 33.33);
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(0, 0), 0.0);
    }

    #[test]
    fn catalog_tags_split_on_commas() {
        let params = CatalogParams {
            tags: Some("rust, async,,".into()),
            q: Some("   ".into()),
            ..Default::default()
        };
        let filter = params.filter();
        assert_eq!(filter.tags, Some(vec!["rust".to_string(), "async".to_string()]));
        assert_eq!(filter.search, None);
    }
}
