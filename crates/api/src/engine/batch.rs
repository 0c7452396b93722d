//! Batch lifecycle: creation, date-driven status, updates and removal.

use chrono::Utc;
use sqlx::PgPool;
use coursemart_core::batch::{self, BatchStatus};
use coursemart_core::enrollment::EnrollmentStatus;
use coursemart_core::error::CoreError;
use coursemart_core::types::DbId;
use coursemart_db::models::batch::{Batch, BatchView, CreateBatch, UpdateBatch};
use coursemart_db::repositories::{BatchRepo, CourseRepo, EnrollmentRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

fn batch_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Batch",
        id,
    })
}

/// Load a batch or fail with 404.
pub async fn find_batch(pool: &PgPool, batch_id: DbId) -> AppResult<Batch> {
    BatchRepo::find_by_id(pool, batch_id)
        .await?
        .ok_or_else(|| batch_not_found(batch_id))
}

/// Load a batch the caller may modify (mentor or admin).
pub async fn find_managed_batch(
    pool: &PgPool,
    batch_id: DbId,
    user: &AuthUser,
) -> AppResult<Batch> {
    let batch = find_batch(pool, batch_id).await?;
    if !user.can_manage(batch.mentor_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only modify your own batches".into(),
        )));
    }
    Ok(batch)
}

/// Batch with its course, mentor and derived values as of now.
pub async fn load_view(pool: &PgPool, batch_id: DbId) -> AppResult<BatchView> {
    let batch = BatchRepo::find_with_refs(pool, batch_id)
        .await?
        .ok_or_else(|| batch_not_found(batch_id))?;
    Ok(BatchView::at(batch, Utc::now()))
}

/// Schedule a batch for a course the caller owns. The caller mentors it.
pub async fn create_batch(pool: &PgPool, user: &AuthUser, input: &CreateBatch) -> AppResult<Batch> {
    let course = CourseRepo::find_by_id(pool, input.course_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Course",
            id: input.course_id,
        }))?;
    if !user.can_manage(course.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only create batches for your own courses".into(),
        )));
    }

    let now = Utc::now();
    batch::validate_new_schedule(input.start_date, input.end_date, now)?;
    let status = batch::advance_status(BatchStatus::Upcoming, input.start_date, input.end_date, now);

    let created = BatchRepo::create(pool, user.user_id, status, input).await?;

    tracing::info!(
        batch_id = created.id,
        course_id = created.course_id,
        mentor_id = created.mentor_id,
        seats = created.seats,
        "Batch created",
    );

    Ok(created)
}

/// Merge `input` into the stored batch, then re-derive its status from the
/// dates.
pub async fn update_batch(
    pool: &PgPool,
    batch_id: DbId,
    user: &AuthUser,
    input: &UpdateBatch,
) -> AppResult<Batch> {
    let mut batch = find_managed_batch(pool, batch_id, user).await?;
    let previous = batch.status;

    input.merge_into(&mut batch);
    batch::validate_schedule(batch.start_date, batch.end_date)?;
    batch::validate_seats(batch.seats, batch.enrolled_students)?;
    batch.status = batch::advance_status(batch.status, batch.start_date, batch.end_date, Utc::now());

    let saved = BatchRepo::save(pool, &batch)
        .await?
        .ok_or_else(|| batch_not_found(batch_id))?;

    if saved.status != previous {
        tracing::info!(batch_id, from = %previous, to = %saved.status, "Batch status changed");
    }

    Ok(saved)
}

/// Delete a batch together with its enrollments.
///
/// The course counter is lowered by the active and completed enrollments
/// that go with it.
pub async fn remove_batch(pool: &PgPool, batch_id: DbId, user: &AuthUser) -> AppResult<()> {
    let batch = find_managed_batch(pool, batch_id, user).await?;
    let counted =
        EnrollmentRepo::count_for_batch(pool, batch_id, EnrollmentStatus::COUNTED).await?;

    if !BatchRepo::delete(pool, batch_id).await? {
        return Err(batch_not_found(batch_id));
    }

    if counted > 0 {
        let delta = -i32::try_from(counted).unwrap_or(i32::MAX);
        if let Err(e) = CourseRepo::adjust_enrollment_count(pool, batch.course_id, delta).await {
            tracing::error!(
                course_id = batch.course_id,
                delta,
                error = %e,
                "Failed to adjust enrollment counter; counter has drifted",
            );
            return Err(e.into());
        }
    }

    tracing::info!(
        batch_id,
        course_id = batch.course_id,
        removed_enrollments = counted,
        "Batch deleted",
    );

    Ok(())
}
