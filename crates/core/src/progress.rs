//! Lesson-completion bookkeeping for an enrollment.
//!
//! The percentage denominator is the course's *current* lesson count, read
//! fresh by the caller on every completion. Editing a course therefore
//! shifts the meaning of every stored percentage without a migration step.

use serde::Serialize;

use crate::enrollment::EnrollmentStatus;
use crate::types::DbId;

/// Upper bound of a progress percentage.
pub const MAX_PERCENTAGE: i16 = 100;

/// Mutable progress sub-state of an enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub completed_lesson_ids: Vec<DbId>,
    pub percentage: i16,
    pub time_spent_minutes: i32,
    pub last_accessed_lesson_id: Option<DbId>,
}

/// What a single [`apply_lesson_completion`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// The lesson was not in the completed set before this call.
    pub newly_completed: bool,
    /// The enrollment status moved `active -> completed` in this call.
    pub auto_completed: bool,
}

/// `round(min(100, 100 * completed / total))`.
///
/// Returns `None` when the course has no lessons; callers keep the previous
/// percentage in that case.
pub fn compute_percentage(completed: usize, total_lessons: i64) -> Option<i16> {
    if total_lessons <= 0 {
        return None;
    }
    let ratio = completed as f64 / total_lessons as f64;
    let pct = (ratio * 100.0).round().min(f64::from(MAX_PERCENTAGE));
    Some(pct as i16)
}

/// Record that `lesson_id` was completed.
///
/// - Adding a lesson already in the set leaves the set and percentage alone.
/// - `time_spent_delta` and the last-accessed lesson are applied on every
///   call, including repeats.
/// - When a newly added lesson brings the percentage to 100 and the status
///   is `active`, the status becomes `completed`. The caller stamps
///   `completed_at` when [`CompletionOutcome::auto_completed`] is set.
pub fn apply_lesson_completion(
    progress: &mut ProgressState,
    status: &mut EnrollmentStatus,
    lesson_id: DbId,
    time_spent_delta: i32,
    total_lessons: i64,
) -> CompletionOutcome {
    let newly_completed = !progress.completed_lesson_ids.contains(&lesson_id);
    let mut auto_completed = false;

    if newly_completed {
        progress.completed_lesson_ids.push(lesson_id);

        if let Some(pct) = compute_percentage(progress.completed_lesson_ids.len(), total_lessons) {
            progress.percentage = pct;
        }

        if progress.percentage == MAX_PERCENTAGE && *status == EnrollmentStatus::Active {
            *status = EnrollmentStatus::Completed;
            auto_completed = true;
        }
    }

    progress.time_spent_minutes = progress.time_spent_minutes.saturating_add(time_spent_delta);
    progress.last_accessed_lesson_id = Some(lesson_id);

    CompletionOutcome {
        newly_completed,
        auto_completed,
    }
}

/// Read-only progress digest for dashboards.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total_lessons: i64,
    pub completed_lessons: usize,
    pub percentage: i16,
    pub is_completed: bool,
    pub time_spent: i32,
}

/// Summarise progress against the course's current lesson count.
pub fn summarize(
    progress: &ProgressState,
    status: EnrollmentStatus,
    total_lessons: i64,
) -> ProgressSummary {
    ProgressSummary {
        total_lessons,
        completed_lessons: progress.completed_lesson_ids.len(),
        percentage: progress.percentage,
        is_completed: status == EnrollmentStatus::Completed
            || progress.percentage == MAX_PERCENTAGE,
        time_spent: progress.time_spent_minutes,
    }
}
