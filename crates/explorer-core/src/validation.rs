//! Client-side validation
//!
//! Pure, total checks for the values a user can enter. Malformed input is
//! classified as invalid, never a panic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire and input format for APOD dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest sol accepted by rover searches
pub const MAX_SOL: u32 = 4000;

/// Largest rover-photo display limit
pub const MAX_PHOTO_COUNT: usize = 50;

/// First day served by the APOD archive
pub fn apod_first_date() -> NaiveDate {
    // 1995-06-16 is a valid calendar date
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` string, ignoring surrounding whitespace
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Inclusive range of selectable APOD dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest valid date
    pub min: NaiveDate,
    /// Latest valid date
    pub max: NaiveDate,
}

impl DateRange {
    /// Check whether a date lies within the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date <= self.max
    }
}

/// Valid APOD date range as of today
pub fn daily_image_date_range() -> DateRange {
    daily_image_date_range_on(today())
}

/// Valid APOD date range as of `today`
pub fn daily_image_date_range_on(today: NaiveDate) -> DateRange {
    DateRange {
        min: apod_first_date(),
        max: today,
    }
}

/// Check an APOD date as entered by the user
///
/// An empty date is valid (the server picks today).
pub fn is_valid_daily_image_date(date: &str) -> bool {
    is_valid_daily_image_date_on(date, today())
}

/// Same as [`is_valid_daily_image_date`] with an explicit reference day
pub fn is_valid_daily_image_date_on(date: &str, today: NaiveDate) -> bool {
    if date.trim().is_empty() {
        return true;
    }
    parse_date(date).is_some_and(|d| daily_image_date_range_on(today).contains(d))
}

/// Check a Martian sol: integral, > 0 and ≤ 4000
pub fn is_valid_sol(sol: f64) -> bool {
    is_bounded_integer(sol, MAX_SOL as f64)
}

/// Check a display limit: integral, > 0 and ≤ 50
pub fn is_valid_photo_count(count: f64) -> bool {
    is_bounded_integer(count, MAX_PHOTO_COUNT as f64)
}

fn is_bounded_integer(n: f64, max: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n > 0.0 && n <= max
}
