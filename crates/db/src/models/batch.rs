//! Batch model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use coursemart_core::batch::{
    AnnouncementPriority, BatchMetrics, BatchStatus, BatchTerms, MaterialType,
};
use coursemart_core::types::{DbId, Timestamp};

use crate::models::course::CourseSummary;

/// A row from the `batches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub id: DbId,
    pub course_id: DbId,
    pub mentor_id: DbId,
    pub name: String,
    pub description: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub seats: i32,
    pub enrolled_students: i32,
    pub instructor_ids: Vec<DbId>,
    #[sqlx(try_from = "String")]
    pub status: BatchStatus,
    #[sqlx(flatten)]
    pub settings: BatchSettings,
    pub timezone: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Batch {
    pub fn terms(&self) -> BatchTerms {
        BatchTerms {
            status: self.status,
            seats: self.seats,
            enrolled_students: self.enrolled_students,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Enrollment settings of a batch.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchSettings {
    pub allow_late_enrollment: bool,
    pub require_approval: bool,
    pub max_late_enrollment_days: i32,
}

/// Partial settings, merged field by field over the stored ones.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BatchSettingsInput {
    pub allow_late_enrollment: Option<bool>,
    pub require_approval: Option<bool>,
    #[validate(range(min = 0, max = 365))]
    pub max_late_enrollment_days: Option<i32>,
}

impl BatchSettingsInput {
    pub fn merge_into(&self, settings: &mut BatchSettings) {
        if let Some(v) = self.allow_late_enrollment {
            settings.allow_late_enrollment = v;
        }
        if let Some(v) = self.require_approval {
            settings.require_approval = v;
        }
        if let Some(v) = self.max_late_enrollment_days {
            settings.max_late_enrollment_days = v;
        }
    }
}

/// DTO for creating a batch. The caller becomes its mentor.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatch {
    pub course_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    #[validate(range(min = 1))]
    pub seats: i32,
    #[validate(length(max = 50))]
    pub instructor_ids: Option<Vec<DbId>>,
    #[validate(nested)]
    pub settings: Option<BatchSettingsInput>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
}

/// DTO for updating a batch. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    #[validate(range(min = 1))]
    pub seats: Option<i32>,
    #[validate(length(max = 50))]
    pub instructor_ids: Option<Vec<DbId>>,
    #[validate(nested)]
    pub settings: Option<BatchSettingsInput>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
    pub status: Option<BatchStatus>,
}

impl UpdateBatch {
    /// Apply the present fields to `batch`. Status is left to the caller,
    /// which advances it against the merged dates.
    pub fn merge_into(&self, batch: &mut Batch) {
        if let Some(name) = &self.name {
            batch.name = name.clone();
        }
        if let Some(description) = &self.description {
            batch.description = description.clone();
        }
        if let Some(start) = self.start_date {
            batch.start_date = start;
        }
        if let Some(end) = self.end_date {
            batch.end_date = end;
        }
        if let Some(seats) = self.seats {
            batch.seats = seats;
        }
        if let Some(ids) = &self.instructor_ids {
            batch.instructor_ids = ids.clone();
        }
        if let Some(settings) = &self.settings {
            settings.merge_into(&mut batch.settings);
        }
        if let Some(timezone) = &self.timezone {
            batch.timezone = timezone.clone();
        }
        if let Some(status) = self.status {
            batch.status = status;
        }
    }
}

/// Query filters for the batch list.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub course_id: Option<DbId>,
    pub status: Option<BatchStatus>,
}

/// Mentor columns joined onto batch rows (`mentor_*` aliases).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MentorSummary {
    #[sqlx(rename = "mentor_id")]
    pub id: DbId,
    #[sqlx(rename = "mentor_name")]
    pub name: String,
    #[sqlx(rename = "mentor_email")]
    pub email: String,
}

/// Batch joined with its course and mentor.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchWithRefs {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    #[sqlx(flatten)]
    pub course: CourseSummary,
    #[sqlx(flatten)]
    pub mentor: MentorSummary,
}

/// A batch as listed, with its derived seat and schedule values.
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: BatchWithRefs,
    #[serde(flatten)]
    pub metrics: BatchMetrics,
}

impl BatchView {
    pub fn at(batch: BatchWithRefs, now: Timestamp) -> Self {
        let metrics = batch.batch.terms().metrics(now);
        BatchView { batch, metrics }
    }
}

/// Single-batch view with its materials and announcements.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub view: BatchView,
    pub materials: Vec<BatchMaterial>,
    pub announcements: Vec<BatchAnnouncement>,
}

/// A row from the `batch_materials` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchMaterial {
    pub id: DbId,
    pub batch_id: DbId,
    pub title: String,
    pub description: String,
    pub file_url: String,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub uploaded_by: Option<DbId>,
    pub uploaded_at: Timestamp,
}

/// Body of `POST /batches/{id}/materials`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchMaterial {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub file_url: String,
    #[serde(rename = "type")]
    pub material_type: Option<MaterialType>,
}

/// A row from the `batch_announcements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchAnnouncement {
    pub id: DbId,
    pub batch_id: DbId,
    pub title: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub priority: AnnouncementPriority,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Body of `POST /batches/{id}/announcements`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchAnnouncement {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub priority: Option<AnnouncementPriority>,
}
