//! Enrollment ledger model and DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use coursemart_core::enrollment::EnrollmentStatus;
use coursemart_core::progress::ProgressState;
use coursemart_core::types::{DbId, Timestamp};

use crate::models::course::CourseSummary;

/// A row from the `enrollments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enrollment {
    pub id: DbId,
    pub course_id: DbId,
    pub student_id: DbId,
    pub assigned_by: Option<DbId>,
    /// Set when the student joined a scheduled batch of the course.
    pub batch_id: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    #[sqlx(flatten)]
    pub progress: EnrollmentProgress,
    #[sqlx(flatten)]
    pub payment: PaymentReceipt,
    #[sqlx(flatten)]
    pub certificate: Certificate,
    pub notes: Option<String>,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub enrolled_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    #[serde(skip)]
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Progress columns of an enrollment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnrollmentProgress {
    #[sqlx(rename = "completed_lesson_ids")]
    pub completed_lessons: Vec<DbId>,
    #[sqlx(rename = "progress_percentage")]
    pub percentage: i16,
    /// Minutes.
    #[sqlx(rename = "time_spent_minutes")]
    pub time_spent: i32,
    #[sqlx(rename = "last_accessed_lesson_id")]
    pub last_accessed_lesson: Option<DbId>,
}

impl From<EnrollmentProgress> for ProgressState {
    fn from(p: EnrollmentProgress) -> Self {
        ProgressState {
            completed_lesson_ids: p.completed_lessons,
            percentage: p.percentage,
            time_spent_minutes: p.time_spent,
            last_accessed_lesson_id: p.last_accessed_lesson,
        }
    }
}

impl From<ProgressState> for EnrollmentProgress {
    fn from(p: ProgressState) -> Self {
        EnrollmentProgress {
            completed_lessons: p.completed_lesson_ids,
            percentage: p.percentage,
            time_spent: p.time_spent_minutes,
            last_accessed_lesson: p.last_accessed_lesson_id,
        }
    }
}

/// Payment receipt columns. Overwritten wholesale by each reconciled payment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentReceipt {
    #[sqlx(rename = "payment_amount")]
    pub amount: Decimal,
    #[sqlx(rename = "payment_currency")]
    pub currency: String,
    /// `stripe` or `sslcommerz`; `None` for free and assigned enrollments.
    #[sqlx(rename = "payment_method")]
    pub method: Option<String>,
    #[sqlx(rename = "payment_transaction_id")]
    pub transaction_id: Option<String>,
    #[sqlx(rename = "payment_paid_at")]
    pub paid_at: Option<Timestamp>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certificate {
    #[sqlx(rename = "certificate_issued")]
    pub issued: bool,
    #[sqlx(rename = "certificate_issued_at")]
    pub issued_at: Option<Timestamp>,
    #[sqlx(rename = "certificate_id")]
    pub certificate_id: Option<String>,
}

/// Insert DTO used by open enrollment and corporate assignment.
#[derive(Debug, Clone)]
pub struct CreateEnrollment {
    pub course_id: DbId,
    pub student_id: DbId,
    /// Set only for corporate-assigned enrollments.
    pub assigned_by: Option<DbId>,
    pub batch_id: Option<DbId>,
}

/// Body of `PUT /enrollments/{id}/status`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateEnrollmentStatus {
    pub status: EnrollmentStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Body of `PUT /enrollments/{id}/progress`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MarkLessonComplete {
    pub lesson_id: DbId,
    /// Minutes to add to the running total.
    #[validate(range(min = 0, max = 1440))]
    pub time_spent: Option<i32>,
}

/// Body of `POST /enrollments/{id}/rating`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddRating {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 1000))]
    pub review: Option<String>,
}

/// Body of `POST /enrollments/assign`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignEmployees {
    pub course_id: DbId,
    #[validate(length(min = 1, max = 500))]
    pub employee_ids: Vec<DbId>,
}

/// Result of the paid-enrollment upsert.
#[derive(Debug, Clone, FromRow)]
pub struct UpsertOutcome {
    pub id: DbId,
    /// `true` when the upsert created the row.
    pub inserted: bool,
    /// Status before the upsert; `None` when the row was inserted.
    pub previous_status: Option<String>,
}

/// Enrollment joined with its course summary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[sqlx(flatten)]
    pub course: CourseSummary,
}

/// Student columns joined onto enrollment rows (`student_*` aliases).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentSummary {
    #[sqlx(rename = "student_id")]
    pub id: DbId,
    #[sqlx(rename = "student_name")]
    pub name: String,
    #[sqlx(rename = "student_email")]
    pub email: String,
}

/// Enrollment joined with the enrolled student.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnrollmentWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[sqlx(flatten)]
    pub student: StudentSummary,
}

/// Full enrollment view: course, student and the assigning admin.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EnrollmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[sqlx(flatten)]
    pub course: CourseSummary,
    #[sqlx(flatten)]
    pub student: StudentSummary,
    pub assigned_by_name: Option<String>,
    pub assigned_by_email: Option<String>,
}

/// Outcome of a corporate assignment batch.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentReport {
    pub enrollments: Vec<Enrollment>,
    pub errors: Vec<String>,
}
