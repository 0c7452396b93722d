//! Well-known role name constants.
//!
//! These must match the CHECK constraint on `users.role`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
pub const ROLE_INSTRUCTOR: &str = "instructor";
pub const ROLE_CORPORATE_ADMIN: &str = "corporate_admin";
pub const ROLE_STUDENT: &str = "student";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_USER,
    ROLE_INSTRUCTOR,
    ROLE_CORPORATE_ADMIN,
    ROLE_STUDENT,
];

/// Roles allowed to enroll in, progress through and rate courses.
pub const LEARNER_ROLES: &[&str] = &[
    ROLE_STUDENT,
    ROLE_INSTRUCTOR,
    ROLE_CORPORATE_ADMIN,
    ROLE_ADMIN,
];

/// `true` for roles that can author courses.
pub fn is_instructor(role: &str) -> bool {
    role == ROLE_INSTRUCTOR || role == ROLE_ADMIN
}

/// `true` for roles that can assign courses and manage other learners'
/// enrollments.
pub fn is_enrollment_manager(role: &str) -> bool {
    role == ROLE_CORPORATE_ADMIN || role == ROLE_ADMIN
}

/// `true` for roles allowed on learner-facing enrollment routes.
pub fn is_learner(role: &str) -> bool {
    LEARNER_ROLES.contains(&role)
}

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_guard() {
        assert!(is_instructor(ROLE_ADMIN));
        assert!(is_enrollment_manager(ROLE_ADMIN));
        assert!(is_learner(ROLE_ADMIN));
    }

    #[test]
    fn plain_user_is_not_a_learner() {
        assert!(!is_learner(ROLE_USER));
        assert!(is_learner(ROLE_STUDENT));
    }

    #[test]
    fn corporate_admin_cannot_author() {
        assert!(!is_instructor(ROLE_CORPORATE_ADMIN));
        assert!(is_enrollment_manager(ROLE_CORPORATE_ADMIN));
    }

    #[test]
    fn unknown_role_rejected() {
        let err = validate_role("superuser").unwrap_err();
        assert!(err.contains("Invalid role"));
        assert!(validate_role(ROLE_STUDENT).is_ok());
    }
}
