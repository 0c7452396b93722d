//! Course catalog vocabulary, authoring validation and checkout pricing.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

define_text_enum! {
    /// Authoring lifecycle of a course.
    CourseStatus {
        Draft => "draft",
        Published => "published",
        Archived => "archived",
    }
}

define_text_enum! {
    /// Who may discover the course in the public catalog.
    Visibility {
        Public => "public",
        Private => "private",
    }
}

define_text_enum! {
    /// How learners gain access to a course.
    EnrollmentType {
        /// Any learner may self-enroll.
        Open => "open",
        /// Only a corporate admin can grant access.
        Assigned => "assigned",
    }
}

define_text_enum! {
    PricingPlan {
        Free => "free",
        Paid => "paid",
    }
}

define_text_enum! {
    Audience {
        General => "general",
        Corporate => "corporate",
    }
}

define_text_enum! {
    Difficulty {
        Beginner => "Beginner",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
    }
}

define_text_enum! {
    LessonType {
        Video => "Video",
        Pdf => "PDF",
        Quiz => "Quiz",
        Assignment => "Assignment",
    }
}

/// Catalog categories accepted on create/update.
pub const VALID_CATEGORIES: &[&str] = &[
    "Web Development",
    "AI/ML",
    "Data Science",
    "UI/UX",
    "Mobile Development",
    "DevOps",
    "Cybersecurity",
    "Database",
    "Other",
];

/// Default lesson duration when none is supplied.
pub const DEFAULT_LESSON_DURATION: &str = "0:00";

/// Lesson duration in `MM:SS` form, minutes `0..=59`.
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-5]?\d):([0-5]\d)$").expect("duration pattern is a valid regex")
});

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that `category` is one of [`VALID_CATEGORIES`].
pub fn validate_category(category: &str) -> Result<(), CoreError> {
    if VALID_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid category '{category}'. Must be one of: {}",
            VALID_CATEGORIES.join(", ")
        )))
    }
}

/// Validate a lesson duration string (`MM:SS`).
pub fn validate_lesson_duration(duration: &str) -> Result<(), CoreError> {
    if DURATION_RE.is_match(duration) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Duration must be in format MM:SS".to_string(),
        ))
    }
}

/// Validate a discount percentage (`0..=100`).
pub fn validate_discount(discount: Decimal) -> Result<(), CoreError> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(CoreError::Validation(
            "Discount must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Validate a list price (`>= 0`).
pub fn validate_price(price: Decimal) -> Result<(), CoreError> {
    if price < Decimal::ZERO {
        return Err(CoreError::Validation(
            "Price must be a positive number".to_string(),
        ));
    }
    Ok(())
}

/// A course can be published once it has a title, a description and at
/// least one module.
pub fn ensure_publishable(
    title: &str,
    description: &str,
    module_count: i64,
) -> Result<(), CoreError> {
    if title.trim().is_empty() || description.trim().is_empty() || module_count == 0 {
        return Err(CoreError::Validation(
            "Course must have title, description, and at least one module to publish".to_string(),
        ));
    }
    Ok(())
}

/// Public + published courses are readable by anyone, including anonymous
/// callers.
pub fn is_publicly_readable(visibility: Visibility, status: CourseStatus) -> bool {
    visibility == Visibility::Public && status == CourseStatus::Published
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

/// Parse `M:SS` into fractional minutes. Returns `None` for malformed input.
fn duration_minutes(duration: &str) -> Option<f64> {
    let (minutes, seconds) = duration.split_once(':')?;
    let minutes: f64 = minutes.trim().parse().ok()?;
    let seconds: f64 = seconds.trim().parse().ok()?;
    Some(minutes + seconds / 60.0)
}

/// Total running time of a course rendered as `h:mm`.
///
/// Only `Video` lessons count; lessons with an unparseable duration are
/// skipped.
pub fn total_duration<'a, I>(lessons: I) -> String
where
    I: IntoIterator<Item = (LessonType, &'a str)>,
{
    let total_minutes: f64 = lessons
        .into_iter()
        .filter(|(kind, _)| *kind == LessonType::Video)
        .filter_map(|(_, duration)| duration_minutes(duration))
        .sum();

    let hours = (total_minutes / 60.0).floor() as i64;
    let mins = (total_minutes % 60.0).floor() as i64;
    format!("{hours}:{mins:02}")
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Price after applying the percentage discount.
pub fn discounted_price(price: Decimal, discount_percent: Decimal) -> Decimal {
    price - price * discount_percent / Decimal::ONE_HUNDRED
}

/// Convert a major-unit amount into integer minor units (cents), rounding
/// half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, CoreError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| CoreError::Validation(format!("Amount {amount} is out of range")))
}

/// Convert integer minor units back into a major-unit amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Render an amount with exactly two decimal places (`"40.00"`).
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Checkout may only start for a published course on the paid plan with a
/// positive price.
pub fn ensure_purchasable(
    status: CourseStatus,
    plan: PricingPlan,
    price: Decimal,
) -> Result<(), CoreError> {
    if status != CourseStatus::Published {
        return Err(CoreError::Validation("Course is not published".to_string()));
    }
    if plan != PricingPlan::Paid || price <= Decimal::ZERO {
        return Err(CoreError::Validation("Course is not paid".to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
