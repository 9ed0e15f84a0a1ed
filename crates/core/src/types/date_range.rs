//! Inclusive calendar date ranges.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
///
/// Both ends are part of the range, so a range with `start == end` covers
/// exactly one day. The `start <= end` invariant is checked by
/// [`crate::validate_for_persistence`] rather than at construction, which lets
/// request decoders build a range first and report the violation in the same
/// place as every other structural rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range from its two ends.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Create a range covering a single day.
    #[must_use]
    pub const fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Create a range whose end defaults to its start when absent.
    #[must_use]
    pub fn starting(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end: end.unwrap_or(start),
        }
    }

    /// Returns true when `start <= end`.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Returns true when the range covers exactly one day.
    #[must_use]
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Returns true when the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns true when `day` falls inside the range.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days covered, or zero for an unordered range.
    #[must_use]
    pub fn day_count(&self) -> i64 {
        if self.is_ordered() {
            (self.end - self.start).num_days() + 1
        } else {
            0
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_overlap_shared_boundary_day() {
        let a = DateRange::new(day(2024, 1, 1), day(2024, 1, 5));
        let b = DateRange::new(day(2024, 1, 5), day(2024, 1, 8));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let a = DateRange::new(day(2024, 1, 1), day(2024, 1, 5));
        let b = DateRange::new(day(2024, 1, 6), day(2024, 1, 8));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_starting_defaults_end_to_start() {
        let range = DateRange::starting(day(2024, 1, 15), None);
        assert_eq!(range.end, day(2024, 1, 15));
        assert!(range.is_single_day());
        assert_eq!(range.day_count(), 1);
    }

    #[test]
    fn test_day_count_unordered_is_zero() {
        let range = DateRange::new(day(2024, 1, 5), day(2024, 1, 1));
        assert!(!range.is_ordered());
        assert_eq!(range.day_count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DateRange::single_day(day(2024, 3, 1)).to_string(),
            "2024-03-01"
        );
        assert_eq!(
            DateRange::new(day(2024, 3, 1), day(2024, 3, 4)).to_string(),
            "2024-03-01 to 2024-03-04"
        );
    }

    fn ordered_range() -> impl Strategy<Value = DateRange> {
        (0i64..400, 0i64..30).prop_map(|(offset, len)| {
            let start = day(2024, 1, 1) + chrono::Duration::days(offset);
            DateRange::new(start, start + chrono::Duration::days(len))
        })
    }

    proptest! {
        #[test]
        fn prop_overlap_matches_shared_day(a in ordered_range(), b in ordered_range()) {
            let mut shared = false;
            let mut cursor = a.start;
            while cursor <= a.end {
                if b.contains(cursor) {
                    shared = true;
                    break;
                }
                cursor = cursor.succ_opt().unwrap();
            }
            prop_assert_eq!(a.overlaps(&b), shared);
        }

        #[test]
        fn prop_overlap_is_symmetric(a in ordered_range(), b in ordered_range()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
