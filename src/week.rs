use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::AllocationError;

/// The weekdays an allocation run covers, in week order.
pub const WORK_WEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Parses a weekday label from a submission form ("Monday".."Friday",
/// case-insensitive, short forms accepted)
pub fn parse_weekday(label: &str) -> Option<Weekday> {
    match label.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        _ => None,
    }
}

/// Returns the display label for a weekday
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A concrete working week: the mapping from weekday labels to calendar dates.
///
/// Built from an explicit anchor passed in by the caller. The anchor is never
/// derived from the current time; computing "today's Monday" inside the
/// allocator caused unexpected week resets in earlier versions of this system.
#[derive(Debug, Clone)]
pub struct Week {
    anchor: NaiveDate,
    days: Vec<(Weekday, NaiveDate)>,
}

impl Week {
    /// Builds the week starting at `anchor`, which must be a Monday.
    /// A non-Monday anchor is rejected, never silently corrected.
    pub fn from_anchor(anchor: NaiveDate) -> Result<Self, AllocationError> {
        if anchor.weekday() != Weekday::Mon {
            return Err(AllocationError::Validation(format!(
                "week_anchor {} is a {}, expected a Monday",
                anchor,
                weekday_label(anchor.weekday())
            )));
        }
        let days = WORK_WEEK
            .iter()
            .enumerate()
            .map(|(offset, &day)| (day, anchor + Duration::days(offset as i64)))
            .collect();
        Ok(Week { anchor, days })
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// The (weekday, date) pairs of this week, Monday first.
    pub fn days(&self) -> &[(Weekday, NaiveDate)] {
        &self.days
    }

    /// The concrete date of a weekday within this week.
    pub fn date_of(&self, day: Weekday) -> Option<NaiveDate> {
        self.days
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, date)| *date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.iter().map(|(_, date)| *date).collect()
    }

    /// Whether a date falls inside this week's working days.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.iter().any(|(_, d)| *d == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_from_monday_anchor() {
        let week = Week::from_anchor(date(2025, 6, 2)).unwrap();
        assert_eq!(week.date_of(Weekday::Mon), Some(date(2025, 6, 2)));
        assert_eq!(week.date_of(Weekday::Wed), Some(date(2025, 6, 4)));
        assert_eq!(week.date_of(Weekday::Fri), Some(date(2025, 6, 6)));
        assert_eq!(week.dates().len(), 5);
    }

    #[test]
    fn test_non_monday_anchor_rejected() {
        let err = Week::from_anchor(date(2025, 6, 3)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Tuesday"), "unexpected message: {}", msg);
        assert!(msg.contains("Monday"));
    }

    #[test]
    fn test_contains_only_working_days() {
        let week = Week::from_anchor(date(2025, 6, 2)).unwrap();
        assert!(week.contains(date(2025, 6, 2)));
        assert!(week.contains(date(2025, 6, 6)));
        // Saturday and the next Monday are outside the week
        assert!(!week.contains(date(2025, 6, 7)));
        assert!(!week.contains(date(2025, 6, 9)));
    }

    #[test]
    fn test_parse_weekday_labels() {
        assert_eq!(parse_weekday(" Monday "), Some(Weekday::Mon));
        assert_eq!(parse_weekday("wednesday"), Some(Weekday::Wed));
        assert_eq!(parse_weekday("fri"), Some(Weekday::Fri));
        assert_eq!(parse_weekday("Saturday"), None);
        assert_eq!(parse_weekday("someday"), None);
    }
}
