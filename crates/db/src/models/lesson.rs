//! Lesson model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use coursemart_core::course::LessonType;
use coursemart_core::types::{DbId, Timestamp};

/// A row from the `lessons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lesson {
    pub id: DbId,
    pub module_id: DbId,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub duration: String,
    pub file_url: Option<String>,
    pub external_link: Option<String>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a lesson to a module. Appended after the last lesson.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLesson {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Defaults to `Video` if omitted.
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    /// `MM:SS`; defaults to `0:00`.
    pub duration: Option<String>,
    #[validate(url)]
    pub file_url: Option<String>,
    #[validate(url)]
    pub external_link: Option<String>,
}

/// DTO for updating a lesson. All fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateLesson {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    pub duration: Option<String>,
    #[validate(url)]
    pub file_url: Option<String>,
    #[validate(url)]
    pub external_link: Option<String>,
    pub sort_order: Option<i32>,
}
