//! Domain logic for the course marketplace.
//!
//! This crate has no I/O. It holds the closed vocabularies (course status,
//! enrollment status, batch status, roles, ...), the progress calculator, rating
//! aggregation, checkout pricing and payment-provider signature checks, so
//! the repository and HTTP layers can share one definition of each rule.

#[macro_use]
mod macros;

pub mod batch;
pub mod course;
pub mod enrollment;
pub mod error;
pub mod pagination;
pub mod payment;
pub mod progress;
pub mod rating;
pub mod roles;
pub mod types;
