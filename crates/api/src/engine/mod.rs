//! Enrollment engine.
//!
//! The lifecycle service that creates and mutates enrollments, the
//! reconciliation adapter that turns provider-confirmed payments into
//! enrollments, and the batch schedule rules. Handlers stay thin and
//! delegate here.

pub mod batch;
pub mod enrollment;
pub mod reconciliation;
