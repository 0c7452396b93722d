//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers extract auth and input, delegate to the engine or the
//! repositories in `coursemart_db`, and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod admin;
pub mod batch;
pub mod course;
pub mod curriculum;
pub mod enrollment;
pub mod payment;
pub mod user;
