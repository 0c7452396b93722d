//! Enrollment lifecycle: creation, progress, status, unenroll and rating.
//!
//! Creating or cancelling an enrollment and adjusting the course counter are
//! separate writes. A failure between them leaves the counter drifted until
//! an admin recount runs.

use chrono::Utc;
use sqlx::PgPool;
use coursemart_core::course::{CourseStatus, EnrollmentType};
use coursemart_core::enrollment::{self, EnrollmentStatus, MAX_PROGRESS_RETRIES};
use coursemart_core::error::CoreError;
use coursemart_core::progress::{self, ProgressState, ProgressSummary};
use coursemart_core::rating;
use coursemart_core::types::DbId;
use coursemart_db::models::course::Course;
use coursemart_db::models::enrollment::{
    AddRating, AssignEmployees, AssignmentReport, CreateEnrollment, Enrollment,
    EnrollmentProgress, EnrollmentWithCourse, MarkLessonComplete, UpdateEnrollmentStatus,
};
use coursemart_db::repositories::{BatchRepo, CourseRepo, EnrollmentRepo, LessonRepo, UserRepo};

use crate::engine::batch as engine_batch;
use crate::error::{is_unique_violation, AppError, AppResult};

const ALREADY_ENROLLED: &str = "You are already enrolled in this course";

async fn find_course(pool: &PgPool, course_id: DbId) -> AppResult<Course> {
    CourseRepo::find_by_id(pool, course_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id: course_id,
        }))
}

/// Load an enrollment or fail with 404.
pub async fn find_enrollment(pool: &PgPool, enrollment_id: DbId) -> AppResult<Enrollment> {
    EnrollmentRepo::find_by_id(pool, enrollment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Enrollment",
            id: enrollment_id,
        }))
}

/// Give a batch seat back. Failures are logged; the seat count drifts high.
async fn release_seat(pool: &PgPool, batch_id: DbId) {
    if let Err(e) = BatchRepo::release_seat(pool, batch_id).await {
        tracing::error!(batch_id, error = %e, "Failed to release batch seat");
    }
}

/// Apply a counter delta, logging on failure so drift can be traced.
async fn adjust_counter(pool: &PgPool, course_id: DbId, delta: i32) -> AppResult<()> {
    if let Err(e) = CourseRepo::adjust_enrollment_count(pool, course_id, delta).await {
        tracing::error!(
            course_id,
            delta,
            error = %e,
            "Failed to adjust enrollment counter; counter has drifted",
        );
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// The batch must belong to the course and be taking students now.
async fn check_batch_open(pool: &PgPool, batch_id: DbId, course_id: DbId) -> AppResult<()> {
    let batch = engine_batch::find_batch(pool, batch_id).await?;
    if batch.course_id != course_id {
        return Err(AppError::Core(CoreError::Validation(
            "Batch does not belong to this course".to_string(),
        )));
    }
    if !batch.terms().can_enroll(Utc::now()) {
        return Err(AppError::Core(CoreError::Validation(
            "Batch is not open for enrollment".to_string(),
        )));
    }
    Ok(())
}

/// Self-enroll `student_id` in an open, published course, optionally into
/// one of its batches.
///
/// Any existing enrollment for the pair, cancelled ones included, is a
/// conflict. Joining a batch takes one of its seats; a full batch is a
/// conflict.
pub async fn create_open_enrollment(
    pool: &PgPool,
    course_id: DbId,
    student_id: DbId,
    batch_id: Option<DbId>,
) -> AppResult<EnrollmentWithCourse> {
    let course = find_course(pool, course_id).await?;

    if course.enrollment_type != EnrollmentType::Open || course.status != CourseStatus::Published
    {
        return Err(AppError::Core(CoreError::Validation(
            "Course is not open for enrollment".to_string(),
        )));
    }

    if let Some(batch_id) = batch_id {
        check_batch_open(pool, batch_id, course_id).await?;
    }

    if EnrollmentRepo::find_by_pair(pool, course_id, student_id)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            ALREADY_ENROLLED.to_string(),
        )));
    }

    if let Some(batch_id) = batch_id {
        if BatchRepo::reserve_seat(pool, batch_id).await?.is_none() {
            return Err(AppError::Core(CoreError::Conflict(
                "Batch is full".to_string(),
            )));
        }
    }

    let input = CreateEnrollment {
        course_id,
        student_id,
        assigned_by: None,
        batch_id,
    };
    let created = match EnrollmentRepo::create(pool, &input).await {
        Ok(e) => e,
        Err(e) => {
            if let Some(batch_id) = batch_id {
                release_seat(pool, batch_id).await;
            }
            if is_unique_violation(&e) {
                return Err(AppError::Core(CoreError::Conflict(
                    ALREADY_ENROLLED.to_string(),
                )));
            }
            return Err(e.into());
        }
    };

    adjust_counter(pool, course_id, 1).await?;

    tracing::info!(
        enrollment_id = created.id,
        course_id,
        student_id,
        batch_id,
        "Open enrollment created",
    );

    EnrollmentRepo::find_with_course(pool, created.id)
        .await?
        .ok_or_else(|| AppError::InternalError("Enrollment vanished after insert".to_string()))
}

/// Assign a batch of employees to an assigned-type course.
///
/// Each employee is handled independently; failures are collected as
/// messages and the rest of the batch still runs. The counter moves once,
/// by the number of enrollments created.
pub async fn assign_employees(
    pool: &PgPool,
    input: &AssignEmployees,
    actor_id: DbId,
) -> AppResult<AssignmentReport> {
    let course = find_course(pool, input.course_id).await?;

    if course.enrollment_type != EnrollmentType::Assigned {
        return Err(AppError::Core(CoreError::Validation(
            "Course must be of assigned enrollment type".to_string(),
        )));
    }

    let mut enrollments = Vec::new();
    let mut errors = Vec::new();

    for &employee_id in &input.employee_ids {
        if UserRepo::find_by_id(pool, employee_id).await?.is_none() {
            errors.push(format!("Employee with ID {employee_id} not found"));
            continue;
        }

        let already = format!("Employee {employee_id} is already enrolled in this course");
        if EnrollmentRepo::find_by_pair(pool, course.id, employee_id)
            .await?
            .is_some()
        {
            errors.push(already);
            continue;
        }

        let create = CreateEnrollment {
            course_id: course.id,
            student_id: employee_id,
            assigned_by: Some(actor_id),
            batch_id: None,
        };
        match EnrollmentRepo::create(pool, &create).await {
            Ok(enrollment) => enrollments.push(enrollment),
            Err(e) if is_unique_violation(&e) => errors.push(already),
            Err(e) => {
                tracing::error!(
                    course_id = course.id,
                    employee_id,
                    error = %e,
                    "Failed to assign employee",
                );
                errors.push(format!("Failed to enroll employee {employee_id}"));
            }
        }
    }

    if !enrollments.is_empty() {
        let created = i32::try_from(enrollments.len()).unwrap_or(i32::MAX);
        adjust_counter(pool, course.id, created).await?;
    }

    tracing::info!(
        course_id = course.id,
        assigned_by = actor_id,
        created = enrollments.len(),
        failed = errors.len(),
        "Employees assigned",
    );

    Ok(AssignmentReport {
        enrollments,
        errors,
    })
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Record a lesson completion for the enrolled student.
///
/// The write is a compare-and-swap on the enrollment version. A concurrent
/// writer forces a re-read and the completion is applied again to the fresh
/// state, so neither completion is lost.
pub async fn mark_lesson_complete(
    pool: &PgPool,
    enrollment_id: DbId,
    actor_id: DbId,
    input: &MarkLessonComplete,
) -> AppResult<EnrollmentProgress> {
    let time_spent = input.time_spent.unwrap_or(0);

    for attempt in 1..=MAX_PROGRESS_RETRIES {
        let enrollment = find_enrollment(pool, enrollment_id).await?;
        enrollment::ensure_student(enrollment.student_id, actor_id)?;

        let total_lessons = LessonRepo::count_for_course(pool, enrollment.course_id).await?;

        let mut state: ProgressState = enrollment.progress.into();
        let mut status = enrollment.status;
        let outcome = progress::apply_lesson_completion(
            &mut state,
            &mut status,
            input.lesson_id,
            time_spent,
            total_lessons,
        );
        let completed_at = outcome.auto_completed.then(Utc::now);

        let saved = EnrollmentRepo::save_progress(
            pool,
            enrollment_id,
            enrollment.version,
            &state,
            status,
            completed_at,
        )
        .await?;

        if let Some(updated) = saved {
            if outcome.auto_completed {
                tracing::info!(
                    enrollment_id,
                    course_id = updated.course_id,
                    "Enrollment auto-completed",
                );
            }
            return Ok(updated.progress);
        }

        tracing::debug!(enrollment_id, attempt, "Progress write lost a version race");
    }

    tracing::warn!(enrollment_id, "Progress update gave up after repeated version races");
    Err(AppError::Core(CoreError::Conflict(
        "Enrollment was modified concurrently, please retry".to_string(),
    )))
}

/// Progress digest against the course's current lesson count.
pub async fn progress_summary(
    pool: &PgPool,
    enrollment_id: DbId,
    actor_id: DbId,
    actor_role: &str,
) -> AppResult<ProgressSummary> {
    let enrollment = find_enrollment(pool, enrollment_id).await?;
    enrollment::ensure_student_or_manager(enrollment.student_id, actor_id, actor_role)?;

    let total_lessons = LessonRepo::count_for_course(pool, enrollment.course_id).await?;
    let state: ProgressState = enrollment.progress.into();
    Ok(progress::summarize(&state, enrollment.status, total_lessons))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Set any status. The student, admins and corporate admins may do this,
/// including marking an enrollment completed below 100%.
pub async fn update_status(
    pool: &PgPool,
    enrollment_id: DbId,
    actor_id: DbId,
    actor_role: &str,
    input: &UpdateEnrollmentStatus,
) -> AppResult<Enrollment> {
    let enrollment = find_enrollment(pool, enrollment_id).await?;
    enrollment::ensure_student_or_manager(enrollment.student_id, actor_id, actor_role)?;

    let updated =
        EnrollmentRepo::update_status(pool, enrollment_id, input.status, input.notes.as_deref())
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Enrollment",
                id: enrollment_id,
            }))?;

    tracing::info!(
        enrollment_id,
        from = %enrollment.status,
        to = %updated.status,
        actor_id,
        "Enrollment status updated",
    );

    Ok(updated)
}

/// Cancel the caller's own enrollment.
///
/// The counter is decremented unconditionally, even when the enrollment was
/// already cancelled. A batch seat is given back only on the first
/// cancellation.
pub async fn unenroll(pool: &PgPool, enrollment_id: DbId, actor_id: DbId) -> AppResult<()> {
    let enrollment = find_enrollment(pool, enrollment_id).await?;
    enrollment::ensure_student(enrollment.student_id, actor_id)?;

    EnrollmentRepo::update_status(pool, enrollment_id, EnrollmentStatus::Cancelled, None)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Enrollment",
            id: enrollment_id,
        }))?;
    adjust_counter(pool, enrollment.course_id, -1).await?;

    if let Some(batch_id) = enrollment.batch_id {
        if enrollment.status != EnrollmentStatus::Cancelled {
            release_seat(pool, batch_id).await;
        }
    }

    tracing::info!(
        enrollment_id,
        course_id = enrollment.course_id,
        previous_status = %enrollment.status,
        "Student unenrolled",
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// Store the student's rating and recompute the course aggregate from every
/// rated enrollment.
pub async fn add_rating(
    pool: &PgPool,
    enrollment_id: DbId,
    actor_id: DbId,
    input: &AddRating,
) -> AppResult<Enrollment> {
    enrollment::validate_rating(input.rating)?;

    let enrollment = find_enrollment(pool, enrollment_id).await?;
    enrollment::ensure_student(enrollment.student_id, actor_id)?;

    let updated = EnrollmentRepo::set_rating(
        pool,
        enrollment_id,
        input.rating,
        Some(input.review.as_deref().unwrap_or("")),
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Enrollment",
        id: enrollment_id,
    }))?;

    let ratings = EnrollmentRepo::list_ratings(pool, enrollment.course_id).await?;
    let aggregate = rating::aggregate(&ratings);
    CourseRepo::set_rating(pool, enrollment.course_id, &aggregate).await?;

    tracing::info!(
        enrollment_id,
        course_id = enrollment.course_id,
        rating = input.rating,
        average = aggregate.average,
        count = aggregate.count,
        "Course rating recomputed",
    );

    Ok(updated)
}
