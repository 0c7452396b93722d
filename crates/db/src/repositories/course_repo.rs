//! Repository for the `courses` table.

use sqlx::PgPool;
use coursemart_core::course::CourseStatus;
use coursemart_core::rating::RatingAggregate;
use coursemart_core::types::DbId;

use crate::models::course::{
    Course, CourseFilter, CourseSort, CreateCourse, UpdateCourse, UpdateCourseSettings,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, title, description, category, tags, audience, thumbnail, \
    difficulty, language, prerequisites, objectives, pricing_plan, price, discount, visibility, \
    enrollment_type, status, total_duration, enrollment_count, rating_average, rating_count, \
    created_at, updated_at";

/// Catalog predicate. Every filter is optional; `$7` defaults to `published`.
const CATALOG_WHERE: &str = "visibility = 'public'
      AND status = COALESCE($7, 'published')
      AND ($1::text IS NULL OR title ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR category = $2)
      AND ($3::text IS NULL OR pricing_plan = $3)
      AND ($4::text IS NULL OR audience = $4)
      AND ($5::text IS NULL OR difficulty = $5)
      AND ($6::text[] IS NULL OR tags && $6)";

/// Provides CRUD operations for courses and their denormalized counters.
pub struct CourseRepo;

impl CourseRepo {
    /// Insert a new `draft` course owned by `owner_id`.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateCourse,
    ) -> Result<Course, sqlx::Error> {
        let query = format!(
            "INSERT INTO courses
                (owner_id, title, description, category, tags, audience, thumbnail, difficulty,
                 language, prerequisites, objectives, pricing_plan, price, discount, visibility,
                 enrollment_type)
             VALUES ($1, $2, COALESCE($3, ''), $4, COALESCE($5, '{{}}'), COALESCE($6, 'general'),
                     $7, COALESCE($8, 'Beginner'), COALESCE($9, 'English'), COALESCE($10, '{{}}'),
                     COALESCE($11, '{{}}'), COALESCE($12, 'free'), COALESCE($13, 0),
                     COALESCE($14, 0), COALESCE($15, 'public'), COALESCE($16, 'open'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(owner_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.tags)
            .bind(input.audience.map(|a| a.as_str()))
            .bind(&input.thumbnail)
            .bind(input.difficulty.map(|d| d.as_str()))
            .bind(&input.language)
            .bind(&input.prerequisites)
            .bind(&input.objectives)
            .bind(input.pricing_plan.map(|p| p.as_str()))
            .bind(input.price)
            .bind(input.discount)
            .bind(input.visibility.map(|v| v.as_str()))
            .bind(input.enrollment_type.map(|e| e.as_str()))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Public catalog page.
    pub async fn list_catalog(
        pool: &PgPool,
        filter: &CourseFilter,
        sort: CourseSort,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Course>, sqlx::Error> {
        let direction = if descending { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT {COLUMNS} FROM courses
             WHERE {CATALOG_WHERE}
             ORDER BY {} {direction}, id {direction}
             LIMIT $8 OFFSET $9",
            sort.column()
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(&filter.search)
            .bind(&filter.category)
            .bind(filter.plan.map(|p| p.as_str()))
            .bind(filter.audience.map(|a| a.as_str()))
            .bind(filter.difficulty.map(|d| d.as_str()))
            .bind(&filter.tags)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Total rows matching [`CourseRepo::list_catalog`]'s filter.
    pub async fn count_catalog(pool: &PgPool, filter: &CourseFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM courses WHERE {CATALOG_WHERE}");
        sqlx::query_scalar(&query)
            .bind(&filter.search)
            .bind(&filter.category)
            .bind(filter.plan.map(|p| p.as_str()))
            .bind(filter.audience.map(|a| a.as_str()))
            .bind(filter.difficulty.map(|d| d.as_str()))
            .bind(&filter.tags)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_one(pool)
            .await
    }

    /// Courses owned by `owner_id`, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        status: Option<CourseStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Course>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM courses
             WHERE owner_id = $1 AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(owner_id)
            .bind(status.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        status: Option<CourseStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM courses WHERE owner_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(owner_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(pool)
        .await
    }

    /// Update course content. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCourse,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                tags = COALESCE($5, tags),
                audience = COALESCE($6, audience),
                thumbnail = COALESCE($7, thumbnail),
                difficulty = COALESCE($8, difficulty),
                language = COALESCE($9, language),
                prerequisites = COALESCE($10, prerequisites),
                objectives = COALESCE($11, objectives)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.tags)
            .bind(input.audience.map(|a| a.as_str()))
            .bind(&input.thumbnail)
            .bind(input.difficulty.map(|d| d.as_str()))
            .bind(&input.language)
            .bind(&input.prerequisites)
            .bind(&input.objectives)
            .fetch_optional(pool)
            .await
    }

    /// Update pricing, visibility and enrollment type.
    pub async fn update_settings(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCourseSettings,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!(
            "UPDATE courses SET
                pricing_plan = COALESCE($2, pricing_plan),
                price = COALESCE($3, price),
                discount = COALESCE($4, discount),
                visibility = COALESCE($5, visibility),
                enrollment_type = COALESCE($6, enrollment_type)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(input.pricing_plan.map(|p| p.as_str()))
            .bind(input.price)
            .bind(input.discount)
            .bind(input.visibility.map(|v| v.as_str()))
            .bind(input.enrollment_type.map(|e| e.as_str()))
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: CourseStatus,
    ) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("UPDATE courses SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Delete a course. Modules, lessons and enrollments cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add `delta` to the cached enrollment counter. No floor is applied.
    pub async fn adjust_enrollment_count(
        pool: &PgPool,
        id: DbId,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE courses SET enrollment_count = enrollment_count + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reset the cached counter to the live count of active and completed
    /// enrollments. Returns the new value, or `None` if the course is gone.
    pub async fn recount_enrollments(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE courses c SET enrollment_count = (
                 SELECT COUNT(*) FROM enrollments e
                 WHERE e.course_id = c.id AND e.status IN ('active', 'completed')
             )
             WHERE c.id = $1
             RETURNING c.enrollment_count",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Recount every course whose cached counter has drifted. Returns the
    /// number of courses corrected.
    pub async fn recount_all_enrollments(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE courses c SET enrollment_count = live.n
             FROM (
                 SELECT c2.id, COUNT(e.id)::int AS n
                 FROM courses c2
                 LEFT JOIN enrollments e
                   ON e.course_id = c2.id AND e.status IN ('active', 'completed')
                 GROUP BY c2.id
             ) live
             WHERE c.id = live.id AND c.enrollment_count <> live.n",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_rating(
        pool: &PgPool,
        id: DbId,
        rating: &RatingAggregate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE courses SET rating_average = $2, rating_count = $3 WHERE id = $1")
            .bind(id)
            .bind(rating.average)
            .bind(rating.count)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_total_duration(
        pool: &PgPool,
        id: DbId,
        total_duration: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE courses SET total_duration = $2 WHERE id = $1")
            .bind(id)
            .bind(total_duration)
            .execute(pool)
            .await?;
        Ok(())
    }
}
