//! Enrollment status vocabulary and the access rules around it.

use crate::error::CoreError;
use crate::roles;
use crate::types::DbId;

define_text_enum! {
    /// Lifecycle state of an enrollment. Any state is settable through a
    /// status update; only `active -> completed` happens automatically.
    EnrollmentStatus {
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
        Paused => "paused",
    }
}

impl EnrollmentStatus {
    /// Statuses that count toward a course's enrollment counter and grant
    /// access to private course content.
    pub const COUNTED: &'static [EnrollmentStatus] =
        &[EnrollmentStatus::Active, EnrollmentStatus::Completed];

    /// `true` for `active` and `completed`.
    pub fn is_counted(self) -> bool {
        Self::COUNTED.contains(&self)
    }

    /// Whether a recorded payment should move this status back to `active`
    /// when reactivation on payment is enabled.
    pub fn reactivates_on_payment(self) -> bool {
        matches!(self, EnrollmentStatus::Cancelled | EnrollmentStatus::Paused)
    }
}

/// Minimum star rating.
pub const MIN_RATING: i16 = 1;

/// Maximum star rating.
pub const MAX_RATING: i16 = 5;

/// Maximum review length in characters.
pub const MAX_REVIEW_LEN: usize = 1000;

/// Attempts made by a progress update before giving up on a version race.
pub const MAX_PROGRESS_RETRIES: usize = 3;

/// Validate a star rating (`1..=5`).
pub fn validate_rating(rating: i16) -> Result<(), CoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ))
    }
}

/// Parse a comma-separated status filter (`"active,completed"`).
///
/// Blank entries are ignored; an empty result means "no filter".
pub fn parse_status_filter(raw: &str) -> Result<Vec<EnrollmentStatus>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Only the enrolled student may act. Used by progress, rating and
/// unenroll, none of which have an admin override.
pub fn ensure_student(student_id: DbId, actor_id: DbId) -> Result<(), CoreError> {
    if student_id == actor_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Access denied".to_string()))
    }
}

/// The enrolled student, admins and corporate admins may read an enrollment
/// or change its status.
pub fn ensure_student_or_manager(
    student_id: DbId,
    actor_id: DbId,
    actor_role: &str,
) -> Result<(), CoreError> {
    if student_id == actor_id || roles::is_enrollment_manager(actor_role) {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Access denied".to_string()))
    }
}

/// The course owner, admins and corporate admins may list a course's
/// enrollments.
pub fn ensure_course_viewer(
    owner_id: DbId,
    actor_id: DbId,
    actor_role: &str,
) -> Result<(), CoreError> {
    ensure_student_or_manager(owner_id, actor_id, actor_role)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::{ROLE_ADMIN, ROLE_CORPORATE_ADMIN, ROLE_INSTRUCTOR, ROLE_STUDENT};

    #[test]
    fn counted_statuses() {
        assert!(EnrollmentStatus::Active.is_counted());
        assert!(EnrollmentStatus::Completed.is_counted());
        assert!(!EnrollmentStatus::Cancelled.is_counted());
        assert!(!EnrollmentStatus::Paused.is_counted());
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert_matches!(validate_rating(0), Err(CoreError::Validation(_)));
        assert_matches!(validate_rating(6), Err(CoreError::Validation(_)));
    }

    #[test]
    fn status_filter_parsing() {
        let parsed = parse_status_filter("active, completed,").unwrap();
        assert_eq!(
            parsed,
            vec![EnrollmentStatus::Active, EnrollmentStatus::Completed]
        );
        assert!(parse_status_filter("").unwrap().is_empty());
        assert!(parse_status_filter("active,finished").is_err());
    }

    #[test]
    fn only_student_may_progress() {
        assert!(ensure_student(4, 4).is_ok());
        assert_matches!(ensure_student(4, 5), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn managers_may_update_status_for_others() {
        assert!(ensure_student_or_manager(4, 9, ROLE_ADMIN).is_ok());
        assert!(ensure_student_or_manager(4, 9, ROLE_CORPORATE_ADMIN).is_ok());
        assert!(ensure_student_or_manager(4, 9, ROLE_INSTRUCTOR).is_err());
        assert!(ensure_student_or_manager(4, 4, ROLE_STUDENT).is_ok());
    }

    #[test]
    fn payment_reactivation_targets() {
        assert!(EnrollmentStatus::Cancelled.reactivates_on_payment());
        assert!(EnrollmentStatus::Paused.reactivates_on_payment());
        assert!(!EnrollmentStatus::Completed.reactivates_on_payment());
    }
}
