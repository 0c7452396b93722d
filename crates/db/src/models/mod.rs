//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//!
//! Closed vocabularies are stored as TEXT and decoded into the core enums
//! with `#[sqlx(try_from = "String")]`.

pub mod batch;
pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod module;
pub mod user;
