//! Repository for the `enrollments` table (the enrollment ledger).

use sqlx::PgPool;
use coursemart_core::enrollment::EnrollmentStatus;
use coursemart_core::payment::PaidEnrollment;
use coursemart_core::progress::ProgressState;
use coursemart_core::types::{DbId, Timestamp};

use crate::models::enrollment::{
    CreateEnrollment, Enrollment, EnrollmentDetail, EnrollmentWithCourse, EnrollmentWithStudent,
    UpsertOutcome,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, course_id, student_id, assigned_by, batch_id, status, \
    completed_lesson_ids, progress_percentage, time_spent_minutes, last_accessed_lesson_id, \
    payment_amount, payment_currency, payment_method, payment_transaction_id, payment_paid_at, \
    certificate_issued, certificate_issued_at, certificate_id, \
    notes, rating, review, enrolled_at, completed_at, version, created_at, updated_at";

/// Same as [`COLUMNS`], qualified with the `e` alias for joins.
const E_COLUMNS: &str = "e.id, e.course_id, e.student_id, e.assigned_by, e.batch_id, e.status, \
    e.completed_lesson_ids, e.progress_percentage, e.time_spent_minutes, e.last_accessed_lesson_id, \
    e.payment_amount, e.payment_currency, e.payment_method, e.payment_transaction_id, e.payment_paid_at, \
    e.certificate_issued, e.certificate_issued_at, e.certificate_id, \
    e.notes, e.rating, e.review, e.enrolled_at, e.completed_at, e.version, e.created_at, e.updated_at";

/// Course summary columns, aliased for [`crate::models::course::CourseSummary`].
const COURSE_SUMMARY: &str = "c.title AS course_title, c.category AS course_category, \
    c.thumbnail AS course_thumbnail, c.difficulty AS course_difficulty, \
    c.total_duration AS course_total_duration, c.owner_id AS course_owner_id";

/// Student summary columns, aliased for [`crate::models::enrollment::StudentSummary`].
const STUDENT_SUMMARY: &str = "u.name AS student_name, u.email AS student_email";

/// `$n::text[]` status filter; an empty array matches every status.
fn status_strings(statuses: &[EnrollmentStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

/// Provides ledger reads and writes for enrollments.
pub struct EnrollmentRepo;

impl EnrollmentRepo {
    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Insert a new `active` enrollment with zeroed progress.
    ///
    /// A second insert for the same (course, student) pair fails with the
    /// `uq_enrollments_course_student` unique violation.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEnrollment,
    ) -> Result<Enrollment, sqlx::Error> {
        let query = format!(
            "INSERT INTO enrollments (course_id, student_id, assigned_by, batch_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(input.course_id)
            .bind(input.student_id)
            .bind(input.assigned_by)
            .bind(input.batch_id)
            .fetch_one(pool)
            .await
    }

    /// Record a provider-confirmed payment, inserting the enrollment if the
    /// pair has none.
    ///
    /// An existing row only has its payment columns overwritten (last write
    /// wins). Its status is left alone unless `reactivate` is set, in which
    /// case `cancelled` and `paused` become `active`.
    pub async fn upsert_paid(
        pool: &PgPool,
        paid: &PaidEnrollment,
        reactivate: bool,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        sqlx::query_as::<_, UpsertOutcome>(
            "WITH prev AS (
                 SELECT status FROM enrollments WHERE course_id = $1 AND student_id = $2
             ),
             upserted AS (
                 INSERT INTO enrollments
                     (course_id, student_id, status, payment_amount, payment_currency,
                      payment_method, payment_transaction_id, payment_paid_at)
                 VALUES ($1, $2, 'active', $3, $4, $5, $6, NOW())
                 ON CONFLICT ON CONSTRAINT uq_enrollments_course_student DO UPDATE SET
                     payment_amount = EXCLUDED.payment_amount,
                     payment_currency = EXCLUDED.payment_currency,
                     payment_method = EXCLUDED.payment_method,
                     payment_transaction_id = EXCLUDED.payment_transaction_id,
                     payment_paid_at = EXCLUDED.payment_paid_at,
                     status = CASE
                         WHEN $7 AND enrollments.status IN ('cancelled', 'paused') THEN 'active'
                         ELSE enrollments.status
                     END,
                     version = enrollments.version + 1
                 RETURNING id, (xmax = 0) AS inserted
             )
             SELECT upserted.id, upserted.inserted, prev.status AS previous_status
             FROM upserted LEFT JOIN prev ON TRUE",
        )
        .bind(paid.course_id)
        .bind(paid.student_id)
        .bind(paid.amount)
        .bind(&paid.currency)
        .bind(paid.method.as_str())
        .bind(&paid.transaction_id)
        .bind(reactivate)
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1");
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the enrollment for a (course, student) pair, in any status.
    pub async fn find_by_pair(
        pool: &PgPool,
        course_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM enrollments WHERE course_id = $1 AND student_id = $2");
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(course_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
    }

    /// Enrollment with its course summary.
    pub async fn find_with_course(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EnrollmentWithCourse>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {COURSE_SUMMARY}
             FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             WHERE e.id = $1"
        );
        sqlx::query_as::<_, EnrollmentWithCourse>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The student's enrollment for a course, restricted to `statuses`.
    pub async fn find_for_student_course(
        pool: &PgPool,
        course_id: DbId,
        student_id: DbId,
        statuses: &[EnrollmentStatus],
    ) -> Result<Option<EnrollmentWithCourse>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {COURSE_SUMMARY}
             FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             WHERE e.course_id = $1 AND e.student_id = $2
               AND (cardinality($3::text[]) = 0 OR e.status = ANY($3))"
        );
        sqlx::query_as::<_, EnrollmentWithCourse>(&query)
            .bind(course_id)
            .bind(student_id)
            .bind(status_strings(statuses))
            .fetch_optional(pool)
            .await
    }

    /// Enrollment joined with course, student and assigner.
    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EnrollmentDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {COURSE_SUMMARY}, {STUDENT_SUMMARY},
                    a.name AS assigned_by_name, a.email AS assigned_by_email
             FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             JOIN users u ON u.id = e.student_id
             LEFT JOIN users a ON a.id = e.assigned_by
             WHERE e.id = $1"
        );
        sqlx::query_as::<_, EnrollmentDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A student's enrollments, newest first. Empty `statuses` means all.
    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
        statuses: &[EnrollmentStatus],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EnrollmentWithCourse>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {COURSE_SUMMARY}
             FROM enrollments e
             JOIN courses c ON c.id = e.course_id
             WHERE e.student_id = $1
               AND (cardinality($2::text[]) = 0 OR e.status = ANY($2))
             ORDER BY e.enrolled_at DESC, e.id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, EnrollmentWithCourse>(&query)
            .bind(student_id)
            .bind(status_strings(statuses))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_student(
        pool: &PgPool,
        student_id: DbId,
        statuses: &[EnrollmentStatus],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments
             WHERE student_id = $1 AND (cardinality($2::text[]) = 0 OR status = ANY($2))",
        )
        .bind(student_id)
        .bind(status_strings(statuses))
        .fetch_one(pool)
        .await
    }

    /// A course's enrollments with student info, newest first.
    pub async fn list_for_course(
        pool: &PgPool,
        course_id: DbId,
        statuses: &[EnrollmentStatus],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EnrollmentWithStudent>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {STUDENT_SUMMARY}
             FROM enrollments e
             JOIN users u ON u.id = e.student_id
             WHERE e.course_id = $1
               AND (cardinality($2::text[]) = 0 OR e.status = ANY($2))
             ORDER BY e.enrolled_at DESC, e.id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, EnrollmentWithStudent>(&query)
            .bind(course_id)
            .bind(status_strings(statuses))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_course(
        pool: &PgPool,
        course_id: DbId,
        statuses: &[EnrollmentStatus],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments
             WHERE course_id = $1 AND (cardinality($2::text[]) = 0 OR status = ANY($2))",
        )
        .bind(course_id)
        .bind(status_strings(statuses))
        .fetch_one(pool)
        .await
    }

    /// A batch's enrollments with student info, newest first.
    pub async fn list_for_batch(
        pool: &PgPool,
        batch_id: DbId,
        statuses: &[EnrollmentStatus],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EnrollmentWithStudent>, sqlx::Error> {
        let query = format!(
            "SELECT {E_COLUMNS}, {STUDENT_SUMMARY}
             FROM enrollments e
             JOIN users u ON u.id = e.student_id
             WHERE e.batch_id = $1
               AND (cardinality($2::text[]) = 0 OR e.status = ANY($2))
             ORDER BY e.created_at DESC, e.id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, EnrollmentWithStudent>(&query)
            .bind(batch_id)
            .bind(status_strings(statuses))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_batch(
        pool: &PgPool,
        batch_id: DbId,
        statuses: &[EnrollmentStatus],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments
             WHERE batch_id = $1 AND (cardinality($2::text[]) = 0 OR status = ANY($2))",
        )
        .bind(batch_id)
        .bind(status_strings(statuses))
        .fetch_one(pool)
        .await
    }

    /// Every non-null rating submitted for a course.
    pub async fn list_ratings(pool: &PgPool, course_id: DbId) -> Result<Vec<i16>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT rating FROM enrollments WHERE course_id = $1 AND rating IS NOT NULL",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Persist progress if the row is still at `expected_version`.
    ///
    /// Returns `None` when another writer got there first; the caller
    /// re-reads and re-applies. `completed_at` is only written when `Some`.
    pub async fn save_progress(
        pool: &PgPool,
        id: DbId,
        expected_version: i64,
        progress: &ProgressState,
        status: EnrollmentStatus,
        completed_at: Option<Timestamp>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "UPDATE enrollments SET
                completed_lesson_ids = $3,
                progress_percentage = $4,
                time_spent_minutes = $5,
                last_accessed_lesson_id = $6,
                status = $7,
                completed_at = COALESCE($8, completed_at),
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(&progress.completed_lesson_ids)
            .bind(progress.percentage)
            .bind(progress.time_spent_minutes)
            .bind(progress.last_accessed_lesson_id)
            .bind(status.as_str())
            .bind(completed_at)
            .fetch_optional(pool)
            .await
    }

    /// Set the status. Moving to `completed` stamps `completed_at = NOW()`,
    /// overwriting any earlier value. `notes` is kept when `None`.
    ///
    /// Bumps `version` so an in-flight progress write re-reads the status.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: EnrollmentStatus,
        notes: Option<&str>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "UPDATE enrollments SET
                status = $2,
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
                notes = COALESCE($3, notes),
                version = version + 1
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_rating(
        pool: &PgPool,
        id: DbId,
        rating: i16,
        review: Option<&str>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let query = format!(
            "UPDATE enrollments SET rating = $2, review = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Enrollment>(&query)
            .bind(id)
            .bind(rating)
            .bind(review)
            .fetch_optional(pool)
            .await
    }
}
