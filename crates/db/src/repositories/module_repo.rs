//! Repository for the `course_modules` table.

use sqlx::PgPool;
use coursemart_core::types::DbId;

use crate::models::module::{CourseModule, CreateModule, UpdateModule};

const COLUMNS: &str = "id, course_id, name, sort_order, created_at, updated_at";

/// Provides CRUD operations for course modules.
pub struct ModuleRepo;

impl ModuleRepo {
    /// Append a module after the course's current last module.
    pub async fn create(
        pool: &PgPool,
        course_id: DbId,
        input: &CreateModule,
    ) -> Result<CourseModule, sqlx::Error> {
        let query = format!(
            "INSERT INTO course_modules (course_id, name, sort_order)
             VALUES ($1, $2, (SELECT COALESCE(MAX(sort_order) + 1, 0)
                              FROM course_modules WHERE course_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CourseModule>(&query)
            .bind(course_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find a module that belongs to `course_id`.
    pub async fn find_in_course(
        pool: &PgPool,
        course_id: DbId,
        id: DbId,
    ) -> Result<Option<CourseModule>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM course_modules WHERE id = $1 AND course_id = $2");
        sqlx::query_as::<_, CourseModule>(&query)
            .bind(id)
            .bind(course_id)
            .fetch_optional(pool)
            .await
    }

    /// List a course's modules in curriculum order.
    pub async fn list_for_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<CourseModule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM course_modules
             WHERE course_id = $1
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, CourseModule>(&query)
            .bind(course_id)
            .fetch_all(pool)
            .await
    }

    /// Update a module. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        course_id: DbId,
        id: DbId,
        input: &UpdateModule,
    ) -> Result<Option<CourseModule>, sqlx::Error> {
        let query = format!(
            "UPDATE course_modules SET
                name = COALESCE($3, name),
                sort_order = COALESCE($4, sort_order)
             WHERE id = $1 AND course_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CourseModule>(&query)
            .bind(id)
            .bind(course_id)
            .bind(&input.name)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Delete a module and, by cascade, its lessons.
    pub async fn delete(pool: &PgPool, course_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM course_modules WHERE id = $1 AND course_id = $2")
            .bind(id)
            .bind(course_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_for_course(pool: &PgPool, course_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM course_modules WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(pool)
            .await
    }
}
