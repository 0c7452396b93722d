//! Course rating aggregate.
//!
//! The aggregate is recomputed from every rated enrollment of the course on
//! each submission, so its cost grows with the number of ratings.

use serde::Serialize;

/// Average star rating and number of ratings for a course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingAggregate {
    pub average: f64,
    pub count: i32,
}

impl RatingAggregate {
    /// Aggregate of a course nobody has rated.
    pub const EMPTY: RatingAggregate = RatingAggregate {
        average: 0.0,
        count: 0,
    };
}

/// Average all submitted ratings.
pub fn aggregate(ratings: &[i16]) -> RatingAggregate {
    if ratings.is_empty() {
        return RatingAggregate::EMPTY;
    }
    let total: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    RatingAggregate {
        average: total as f64 / ratings.len() as f64,
        count: ratings.len() as i32,
    }
}
