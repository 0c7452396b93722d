//! Repository for the `lessons` table.

use sqlx::PgPool;
use coursemart_core::course::DEFAULT_LESSON_DURATION;
use coursemart_core::types::DbId;

use crate::models::lesson::{CreateLesson, Lesson, UpdateLesson};

const COLUMNS: &str = "id, module_id, title, description, lesson_type, duration, \
    file_url, external_link, sort_order, created_at, updated_at";

/// Same as [`COLUMNS`], qualified with the `l` alias for joins.
const L_COLUMNS: &str = "l.id, l.module_id, l.title, l.description, l.lesson_type, l.duration, \
    l.file_url, l.external_link, l.sort_order, l.created_at, l.updated_at";

/// Provides CRUD operations for lessons.
pub struct LessonRepo;

impl LessonRepo {
    /// Append a lesson after the module's current last lesson.
    pub async fn create(
        pool: &PgPool,
        module_id: DbId,
        input: &CreateLesson,
    ) -> Result<Lesson, sqlx::Error> {
        let query = format!(
            "INSERT INTO lessons
                (module_id, title, description, lesson_type, duration, file_url, external_link, sort_order)
             VALUES ($1, $2, $3, COALESCE($4, 'Video'), $5, $6, $7,
                     (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM lessons WHERE module_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lesson>(&query)
            .bind(module_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.lesson_type.map(|t| t.as_str()))
            .bind(input.duration.as_deref().unwrap_or(DEFAULT_LESSON_DURATION))
            .bind(&input.file_url)
            .bind(&input.external_link)
            .fetch_one(pool)
            .await
    }

    /// Find a lesson that belongs to `module_id`.
    pub async fn find_in_module(
        pool: &PgPool,
        module_id: DbId,
        id: DbId,
    ) -> Result<Option<Lesson>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lessons WHERE id = $1 AND module_id = $2");
        sqlx::query_as::<_, Lesson>(&query)
            .bind(id)
            .bind(module_id)
            .fetch_optional(pool)
            .await
    }

    /// All lessons of a course, ordered by module position then lesson position.
    pub async fn list_for_course(pool: &PgPool, course_id: DbId) -> Result<Vec<Lesson>, sqlx::Error> {
        let query = format!(
            "SELECT {L_COLUMNS} FROM lessons l
             JOIN course_modules m ON m.id = l.module_id
             WHERE m.course_id = $1
             ORDER BY m.sort_order, m.id, l.sort_order, l.id"
        );
        sqlx::query_as::<_, Lesson>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// Update a lesson. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        module_id: DbId,
        id: DbId,
        input: &UpdateLesson,
    ) -> Result<Option<Lesson>, sqlx::Error> {
        let query = format!(
            "UPDATE lessons SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                lesson_type = COALESCE($5, lesson_type),
                duration = COALESCE($6, duration),
                file_url = COALESCE($7, file_url),
                external_link = COALESCE($8, external_link),
                sort_order = COALESCE($9, sort_order)
             WHERE id = $1 AND module_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lesson>(&query)
            .bind(id)
            .bind(module_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.lesson_type.map(|t| t.as_str()))
            .bind(&input.duration)
            .bind(&input.file_url)
            .bind(&input.external_link)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, module_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1 AND module_id = $2")
            .bind(id)
            .bind(module_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current lesson count across all of a course's modules.
    ///
    /// This is the progress denominator and is read fresh on every
    /// completion.
    pub async fn count_for_course(pool: &PgPool, course_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM lessons l
             JOIN course_modules m ON m.id = l.module_id
             WHERE m.course_id = $1",
        )
        .bind(course_id)
        .fetch_one(pool)
        .await
    }
}
