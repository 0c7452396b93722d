//! Course model and DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use coursemart_core::course::{
    Audience, CourseStatus, Difficulty, EnrollmentType, PricingPlan, Visibility,
};
use coursemart_core::types::{DbId, Timestamp};

use crate::models::module::ModuleWithLessons;

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    #[sqlx(try_from = "String")]
    pub audience: Audience,
    pub thumbnail: Option<String>,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub language: String,
    pub prerequisites: Vec<String>,
    pub objectives: Vec<String>,
    #[sqlx(flatten)]
    pub pricing: CoursePricing,
    #[sqlx(try_from = "String")]
    pub visibility: Visibility,
    #[sqlx(try_from = "String")]
    pub enrollment_type: EnrollmentType,
    #[sqlx(try_from = "String")]
    pub status: CourseStatus,
    pub total_duration: String,
    pub enrollment_count: i32,
    #[sqlx(flatten)]
    pub rating: CourseRating,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// `pricing_*` columns of a course.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CoursePricing {
    #[sqlx(rename = "pricing_plan", try_from = "String")]
    pub plan: PricingPlan,
    pub price: Decimal,
    /// Percent, `0..=100`.
    pub discount: Decimal,
}

/// Cached rating aggregate, recomputed on every rating submission.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseRating {
    #[sqlx(rename = "rating_average")]
    pub average: f64,
    #[sqlx(rename = "rating_count")]
    pub count: i32,
}

/// DTO for creating a course. New courses always start as `draft`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourse {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category: String,
    pub tags: Option<Vec<String>>,
    pub audience: Option<Audience>,
    #[validate(url)]
    pub thumbnail: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    pub objectives: Option<Vec<String>>,
    pub pricing_plan: Option<PricingPlan>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub visibility: Option<Visibility>,
    pub enrollment_type: Option<EnrollmentType>,
}

/// DTO for updating course content. All fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCourse {
    #[validate(length(min = 3, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub audience: Option<Audience>,
    #[validate(url)]
    pub thumbnail: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(min = 1, max = 50))]
    pub language: Option<String>,
    pub prerequisites: Option<Vec<String>>,
    pub objectives: Option<Vec<String>>,
}

/// DTO for the pricing and visibility settings step.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCourseSettings {
    pub pricing_plan: Option<PricingPlan>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub visibility: Option<Visibility>,
    pub enrollment_type: Option<EnrollmentType>,
}

/// Query filters for the public catalog.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub plan: Option<PricingPlan>,
    pub audience: Option<Audience>,
    pub difficulty: Option<Difficulty>,
    /// Matches courses carrying any of these tags.
    pub tags: Option<Vec<String>>,
    /// Defaults to `published`.
    pub status: Option<CourseStatus>,
}

/// Catalog sort keys. Each maps to a fixed column expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSort {
    #[default]
    CreatedAt,
    Title,
    Price,
    EnrollmentCount,
    Rating,
}

impl CourseSort {
    pub fn column(self) -> &'static str {
        match self {
            CourseSort::CreatedAt => "created_at",
            CourseSort::Title => "title",
            CourseSort::Price => "price",
            CourseSort::EnrollmentCount => "enrollment_count",
            CourseSort::Rating => "rating_average",
        }
    }
}

/// Course summary joined onto enrollment rows (`course_*` aliases).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseSummary {
    #[sqlx(rename = "course_id")]
    pub id: DbId,
    #[sqlx(rename = "course_title")]
    pub title: String,
    #[sqlx(rename = "course_category")]
    pub category: String,
    #[sqlx(rename = "course_thumbnail")]
    pub thumbnail: Option<String>,
    #[sqlx(rename = "course_difficulty", try_from = "String")]
    pub difficulty: Difficulty,
    #[sqlx(rename = "course_total_duration")]
    pub total_duration: String,
    #[sqlx(rename = "course_owner_id")]
    pub owner_id: DbId,
}

/// Full course with its curriculum.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleWithLessons>,
}
