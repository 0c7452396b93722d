//! Course batches: scheduled cohorts with a seat limit.
//!
//! A batch moves `upcoming -> active -> completed` as its dates pass. The
//! transition is applied whenever a batch is written, not by a timer, so a
//! stored status can lag behind the clock until the next write.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

define_text_enum! {
    BatchStatus {
        Upcoming => "upcoming",
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

define_text_enum! {
    MaterialType {
        Document => "document",
        Video => "video",
        Link => "link",
        Other => "other",
    }
}

define_text_enum! {
    AnnouncementPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

/// Smallest seat count a batch may have.
pub const MIN_SEATS: i32 = 1;

/// Default late-enrollment window, in days.
pub const DEFAULT_MAX_LATE_ENROLLMENT_DAYS: i32 = 7;

/// Dates of a batch being created: ordered, and not starting in the past.
pub fn validate_new_schedule(
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    validate_schedule(start, end)?;
    if start < now {
        return Err(CoreError::Validation(
            "Start date cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

/// Dates of an existing batch after an update.
pub fn validate_schedule(start: Timestamp, end: Timestamp) -> Result<(), CoreError> {
    if start >= end {
        return Err(CoreError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

/// Seat count after an update. Cannot drop below the students already seated.
pub fn validate_seats(seats: i32, enrolled_students: i32) -> Result<(), CoreError> {
    if seats < MIN_SEATS {
        return Err(CoreError::Validation(
            "Seats must be a positive integer".to_string(),
        ));
    }
    if seats < enrolled_students {
        return Err(CoreError::Validation(format!(
            "Seats cannot be fewer than the {enrolled_students} enrolled students"
        )));
    }
    Ok(())
}

/// The status a batch should be saved with at `now`.
///
/// `upcoming` becomes `active` once the start date is reached, and `active`
/// becomes `completed` after the end date. Both steps can happen in one
/// save. `completed` and `cancelled` are never changed.
pub fn advance_status(
    status: BatchStatus,
    start: Timestamp,
    end: Timestamp,
    now: Timestamp,
) -> BatchStatus {
    let mut status = status;
    if status == BatchStatus::Upcoming && now >= start {
        status = BatchStatus::Active;
    }
    if status == BatchStatus::Active && now > end {
        status = BatchStatus::Completed;
    }
    status
}

/// The fields the seat and schedule rules depend on.
#[derive(Debug, Clone, Copy)]
pub struct BatchTerms {
    pub status: BatchStatus,
    pub seats: i32,
    pub enrolled_students: i32,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

impl BatchTerms {
    pub fn available_seats(&self) -> i32 {
        (self.seats - self.enrolled_students).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students >= self.seats
    }

    /// Whole days between start and end, rounded up.
    pub fn duration_days(&self) -> i64 {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        let span = (self.end_date - self.start_date).num_milliseconds().abs();
        (span + DAY_MS - 1) / DAY_MS
    }

    /// A student may join while the batch is upcoming or active, has a free
    /// seat, and `now` lies within its dates.
    pub fn can_enroll(&self, now: Timestamp) -> bool {
        matches!(self.status, BatchStatus::Upcoming | BatchStatus::Active)
            && !self.is_full()
            && now >= self.start_date
            && now <= self.end_date
    }

    /// Elapsed share of the schedule, `0.0..=100.0`.
    pub fn progress(&self, now: Timestamp) -> f64 {
        let total = (self.end_date - self.start_date).num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let elapsed = (now - self.start_date).num_milliseconds();
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn metrics(&self, now: Timestamp) -> BatchMetrics {
        BatchMetrics {
            available_seats: self.available_seats(),
            duration_days: self.duration_days(),
            is_full: self.is_full(),
            can_enroll: self.can_enroll(now),
            progress: (self.progress(now) * 100.0).round() / 100.0,
        }
    }
}

/// Derived values returned alongside every batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchMetrics {
    pub available_seats: i32,
    pub duration_days: i64,
    pub is_full: bool,
    pub can_enroll: bool,
    /// Percent of the schedule elapsed, two decimals.
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(day: u32, hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn terms(status: BatchStatus, seats: i32, enrolled: i32) -> BatchTerms {
        BatchTerms {
            status,
            seats,
            enrolled_students: enrolled,
            start_date: at(1, 0),
            end_date: at(11, 0),
        }
    }

    #[test]
    fn new_schedule_must_be_ordered_and_future() {
        assert!(validate_new_schedule(at(2, 0), at(3, 0), at(1, 0)).is_ok());
        assert_matches!(
            validate_new_schedule(at(3, 0), at(2, 0), at(1, 0)),
            Err(CoreError::Validation(msg)) if msg == "End date must be after start date"
        );
        assert_matches!(
            validate_new_schedule(at(2, 0), at(2, 0), at(1, 0)),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_new_schedule(at(2, 0), at(5, 0), at(3, 0)),
            Err(CoreError::Validation(msg)) if msg == "Start date cannot be in the past"
        );
    }

    #[test]
    fn seats_cannot_drop_below_enrolled() {
        assert!(validate_seats(5, 5).is_ok());
        assert_matches!(validate_seats(0, 0), Err(CoreError::Validation(_)));
        assert_matches!(validate_seats(3, 4), Err(CoreError::Validation(_)));
    }

    #[test]
    fn status_follows_dates() {
        let (start, end) = (at(5, 0), at(10, 0));
        assert_eq!(advance_status(BatchStatus::Upcoming, start, end, at(4, 0)), BatchStatus::Upcoming);
        assert_eq!(advance_status(BatchStatus::Upcoming, start, end, at(5, 0)), BatchStatus::Active);
        assert_eq!(advance_status(BatchStatus::Active, start, end, at(11, 0)), BatchStatus::Completed);
        // Both steps in one save.
        assert_eq!(advance_status(BatchStatus::Upcoming, start, end, at(12, 0)), BatchStatus::Completed);
        assert_eq!(advance_status(BatchStatus::Cancelled, start, end, at(7, 0)), BatchStatus::Cancelled);
        assert_eq!(advance_status(BatchStatus::Completed, start, end, at(7, 0)), BatchStatus::Completed);
    }

    #[test]
    fn seats_and_fullness() {
        assert_eq!(terms(BatchStatus::Active, 10, 3).available_seats(), 7);
        assert_eq!(terms(BatchStatus::Active, 10, 12).available_seats(), 0);
        assert!(terms(BatchStatus::Active, 2, 2).is_full());
        assert!(!terms(BatchStatus::Active, 2, 1).is_full());
    }

    #[test]
    fn duration_rounds_up_to_whole_days() {
        assert_eq!(terms(BatchStatus::Upcoming, 1, 0).duration_days(), 10);
        let mut t = terms(BatchStatus::Upcoming, 1, 0);
        t.end_date = at(3, 1);
        assert_eq!(t.duration_days(), 3);
    }

    #[test]
    fn enrollment_needs_open_status_seat_and_window() {
        let open = terms(BatchStatus::Active, 10, 0);
        assert!(open.can_enroll(at(5, 0)));
        assert!(!open.can_enroll(at(12, 0)));
        assert!(!terms(BatchStatus::Upcoming, 10, 0).can_enroll(Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap()));
        assert!(!terms(BatchStatus::Active, 2, 2).can_enroll(at(5, 0)));
        assert!(!terms(BatchStatus::Cancelled, 10, 0).can_enroll(at(5, 0)));
    }

    #[test]
    fn progress_is_clamped() {
        let t = terms(BatchStatus::Active, 1, 0);
        assert_eq!(t.progress(at(6, 0)), 50.0);
        assert_eq!(t.progress(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()), 0.0);
        assert_eq!(t.progress(at(20, 0)), 100.0);
        assert_eq!(t.metrics(at(6, 0)).progress, 50.0);
    }

    #[test]
    fn vocabularies_parse() {
        assert_eq!("link".parse::<MaterialType>().unwrap(), MaterialType::Link);
        assert_eq!("high".parse::<AnnouncementPriority>().unwrap(), AnnouncementPriority::High);
        assert_matches!("paused".parse::<BatchStatus>(), Err(CoreError::Validation(_)));
    }
}
