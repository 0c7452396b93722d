//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`auth::OptionalAuthUser`] -- Same, but anonymous requests pass through.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireInstructor`] -- Requires `instructor` or `admin`.
//! - [`rbac::RequireCorporateAdmin`] -- Requires `corporate_admin` or `admin`.
//! - [`rbac::RequireLearner`] -- Requires a role allowed to enroll.
//! - [`rbac::RequireAuth`] -- Requires any authenticated user.

pub mod auth;
pub mod rbac;
