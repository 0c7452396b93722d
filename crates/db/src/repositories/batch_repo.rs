//! Repository for `batches` and their materials and announcements.

use sqlx::PgPool;
use coursemart_core::batch::{AnnouncementPriority, BatchStatus, MaterialType};
use coursemart_core::types::DbId;

use crate::models::batch::{
    Batch, BatchAnnouncement, BatchFilter, BatchMaterial, BatchWithRefs, CreateBatch,
    CreateBatchAnnouncement, CreateBatchMaterial,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, course_id, mentor_id, name, description, start_date, end_date, \
    seats, enrolled_students, instructor_ids, status, allow_late_enrollment, require_approval, \
    max_late_enrollment_days, timezone, created_at, updated_at";

/// Same as [`COLUMNS`], qualified with the `b` alias for joins.
const B_COLUMNS: &str = "b.id, b.course_id, b.mentor_id, b.name, b.description, b.start_date, \
    b.end_date, b.seats, b.enrolled_students, b.instructor_ids, b.status, \
    b.allow_late_enrollment, b.require_approval, b.max_late_enrollment_days, b.timezone, \
    b.created_at, b.updated_at";

/// Course and mentor columns for [`BatchWithRefs`].
const REFS: &str = "c.title AS course_title, c.category AS course_category, \
    c.thumbnail AS course_thumbnail, c.difficulty AS course_difficulty, \
    c.total_duration AS course_total_duration, c.owner_id AS course_owner_id, \
    u.name AS mentor_name, u.email AS mentor_email";

const REFS_JOIN: &str = "FROM batches b
     JOIN courses c ON c.id = b.course_id
     JOIN users u ON u.id = b.mentor_id";

const LIST_WHERE: &str = "($1::bigint IS NULL OR b.course_id = $1)
      AND ($2::text IS NULL OR b.status = $2)";

const MATERIAL_COLUMNS: &str =
    "id, batch_id, title, description, file_url, material_type, uploaded_by, uploaded_at";

const ANNOUNCEMENT_COLUMNS: &str =
    "id, batch_id, title, content, priority, created_by, created_at";

/// Provides CRUD operations for batches and their seat counter.
pub struct BatchRepo;

impl BatchRepo {
    /// Insert a batch mentored by `mentor_id` with an already-resolved status.
    pub async fn create(
        pool: &PgPool,
        mentor_id: DbId,
        status: BatchStatus,
        input: &CreateBatch,
    ) -> Result<Batch, sqlx::Error> {
        let settings = input.settings.clone().unwrap_or_default();
        let query = format!(
            "INSERT INTO batches
                (course_id, mentor_id, name, description, start_date, end_date, seats,
                 instructor_ids, status, allow_late_enrollment, require_approval,
                 max_late_enrollment_days, timezone)
             VALUES ($1, $2, $3, COALESCE($4, ''), $5, $6, $7, COALESCE($8, '{{}}'), $9,
                     COALESCE($10, FALSE), COALESCE($11, FALSE), COALESCE($12, 7),
                     COALESCE($13, 'UTC'))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(input.course_id)
            .bind(mentor_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.seats)
            .bind(&input.instructor_ids)
            .bind(status.as_str())
            .bind(settings.allow_late_enrollment)
            .bind(settings.require_approval)
            .bind(settings.max_late_enrollment_days)
            .bind(&input.timezone)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM batches WHERE id = $1");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_refs(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BatchWithRefs>, sqlx::Error> {
        let query = format!("SELECT {B_COLUMNS}, {REFS} {REFS_JOIN} WHERE b.id = $1");
        sqlx::query_as::<_, BatchWithRefs>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Batches ordered by start date, soonest first.
    pub async fn list(
        pool: &PgPool,
        filter: &BatchFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BatchWithRefs>, sqlx::Error> {
        let query = format!(
            "SELECT {B_COLUMNS}, {REFS} {REFS_JOIN}
             WHERE {LIST_WHERE}
             ORDER BY b.start_date ASC, b.id ASC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, BatchWithRefs>(&query)
            .bind(filter.course_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, filter: &BatchFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM batches b WHERE {LIST_WHERE}");
        sqlx::query_scalar(&query)
            .bind(filter.course_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_one(pool)
            .await
    }

    /// Write every editable column of `batch`. The seat counter is not
    /// touched; it only moves through [`BatchRepo::reserve_seat`] and
    /// [`BatchRepo::release_seat`].
    pub async fn save(pool: &PgPool, batch: &Batch) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!(
            "UPDATE batches SET
                name = $2,
                description = $3,
                start_date = $4,
                end_date = $5,
                seats = $6,
                instructor_ids = $7,
                status = $8,
                allow_late_enrollment = $9,
                require_approval = $10,
                max_late_enrollment_days = $11,
                timezone = $12
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Batch>(&query)
            .bind(batch.id)
            .bind(&batch.name)
            .bind(&batch.description)
            .bind(batch.start_date)
            .bind(batch.end_date)
            .bind(batch.seats)
            .bind(&batch.instructor_ids)
            .bind(batch.status.as_str())
            .bind(batch.settings.allow_late_enrollment)
            .bind(batch.settings.require_approval)
            .bind(batch.settings.max_late_enrollment_days)
            .bind(&batch.timezone)
            .fetch_optional(pool)
            .await
    }

    /// Delete a batch. Its materials, announcements and enrollments go with it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Take a seat. Returns the new count, or `None` when the batch is full.
    pub async fn reserve_seat(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE batches SET enrolled_students = enrolled_students + 1
             WHERE id = $1 AND enrolled_students < seats
             RETURNING enrolled_students",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Give a seat back, never going below zero.
    pub async fn release_seat(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE batches SET enrolled_students = GREATEST(enrolled_students - 1, 0)
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Materials and announcements
    // -----------------------------------------------------------------------

    pub async fn add_material(
        pool: &PgPool,
        batch_id: DbId,
        uploaded_by: DbId,
        input: &CreateBatchMaterial,
    ) -> Result<BatchMaterial, sqlx::Error> {
        let query = format!(
            "INSERT INTO batch_materials (batch_id, title, description, file_url, material_type, uploaded_by)
             VALUES ($1, $2, COALESCE($3, ''), $4, $5, $6)
             RETURNING {MATERIAL_COLUMNS}"
        );
        sqlx::query_as::<_, BatchMaterial>(&query)
            .bind(batch_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.file_url)
            .bind(input.material_type.unwrap_or(MaterialType::Document).as_str())
            .bind(uploaded_by)
            .fetch_one(pool)
            .await
    }

    /// Materials in upload order.
    pub async fn list_materials(
        pool: &PgPool,
        batch_id: DbId,
    ) -> Result<Vec<BatchMaterial>, sqlx::Error> {
        let query = format!(
            "SELECT {MATERIAL_COLUMNS} FROM batch_materials
             WHERE batch_id = $1 ORDER BY uploaded_at, id"
        );
        sqlx::query_as::<_, BatchMaterial>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    pub async fn add_announcement(
        pool: &PgPool,
        batch_id: DbId,
        created_by: DbId,
        input: &CreateBatchAnnouncement,
    ) -> Result<BatchAnnouncement, sqlx::Error> {
        let query = format!(
            "INSERT INTO batch_announcements (batch_id, title, content, priority, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, BatchAnnouncement>(&query)
            .bind(batch_id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(input.priority.unwrap_or(AnnouncementPriority::Medium).as_str())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Announcements, newest first.
    pub async fn list_announcements(
        pool: &PgPool,
        batch_id: DbId,
    ) -> Result<Vec<BatchAnnouncement>, sqlx::Error> {
        let query = format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM batch_announcements
             WHERE batch_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, BatchAnnouncement>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }
}
