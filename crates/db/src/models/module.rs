//! Course module model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use coursemart_core::types::{DbId, Timestamp};

use crate::models::lesson::Lesson;

/// A row from the `course_modules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseModule {
    pub id: DbId,
    pub course_id: DbId,
    pub name: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a module. Appended after the last module.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModule {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// DTO for updating a module.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateModule {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}

/// A module with its lessons in order, as returned by course detail.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<Lesson>,
}

impl ModuleWithLessons {
    /// Group lessons (ordered by module then position) under their modules.
    pub fn group(modules: Vec<CourseModule>, lessons: Vec<Lesson>) -> Vec<ModuleWithLessons> {
        let mut grouped: Vec<ModuleWithLessons> = modules
            .into_iter()
            .map(|module| ModuleWithLessons {
                module,
                lessons: Vec::new(),
            })
            .collect();
        for lesson in lessons {
            if let Some(entry) = grouped.iter_mut().find(|m| m.module.id == lesson.module_id) {
                entry.lessons.push(lesson);
            }
        }
        grouped
    }
}
