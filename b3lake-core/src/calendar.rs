//! Business-day resolution for partition dates.

use crate::error::IngestError;
use chrono::{Datelike, NaiveDate, Weekday};

/// Saturdays and Sundays are non-trading days. Exchange holidays are not
/// modelled here; a holiday ingestion surfaces as empty provider data.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The most recent business day strictly before `today`.
pub fn previous_business_day(today: NaiveDate) -> NaiveDate {
    let mut day = today - chrono::Duration::days(1);
    while !is_business_day(day) {
        day -= chrono::Duration::days(1);
    }
    day
}

/// Resolve the target partition date for an ingestion run.
///
/// An explicit `requested` date is parsed strictly as `YYYY-MM-DD` and
/// returned as-is, weekends included (the caller decides whether to skip).
/// With no request, defaults to the previous business day.
pub fn resolve_target_date(
    requested: Option<&str>,
    today: NaiveDate,
) -> Result<NaiveDate, IngestError> {
    match requested {
        Some(input) => {
            NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| IngestError::InvalidDate {
                input: input.to_string(),
            })
        }
        None => Ok(previous_business_day(today)),
    }
}

/// Every calendar day in `[start, end]`, in order.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, IngestError> {
    if start > end {
        return Err(IngestError::InvalidDateRange { start, end });
    }

    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += chrono::Duration::days(1);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekends_are_not_business_days() {
        assert!(!is_business_day(date(2026, 2, 21))); // Saturday
        assert!(!is_business_day(date(2026, 2, 22))); // Sunday
        assert!(is_business_day(date(2026, 2, 23))); // Monday
    }

    #[test]
    fn default_target_on_monday_is_prior_friday() {
        let resolved = resolve_target_date(None, date(2026, 2, 23)).unwrap();
        assert_eq!(resolved, date(2026, 2, 20));
    }

    #[test]
    fn default_target_on_wednesday_is_tuesday() {
        let resolved = resolve_target_date(None, date(2026, 2, 25)).unwrap();
        assert_eq!(resolved, date(2026, 2, 24));
    }

    #[test]
    fn explicit_weekend_date_is_returned_unchanged() {
        let resolved = resolve_target_date(Some("2026-02-21"), date(2026, 2, 23)).unwrap();
        assert_eq!(resolved, date(2026, 2, 21));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        for input in ["21-02-2026", "2026-13-01", "2026-02-30", "yesterday", ""] {
            let result = resolve_target_date(Some(input), date(2026, 2, 23));
            assert!(
                matches!(result, Err(IngestError::InvalidDate { .. })),
                "expected InvalidDate for {input:?}"
            );
        }
    }

    #[test]
    fn days_inclusive_covers_both_endpoints() {
        let days = days_inclusive(date(2026, 2, 20), date(2026, 2, 23)).unwrap();
        assert_eq!(
            days,
            vec![
                date(2026, 2, 20),
                date(2026, 2, 21),
                date(2026, 2, 22),
                date(2026, 2, 23),
            ]
        );
    }

    #[test]
    fn single_day_range_is_allowed() {
        let days = days_inclusive(date(2026, 2, 20), date(2026, 2, 20)).unwrap();
        assert_eq!(days, vec![date(2026, 2, 20)]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = days_inclusive(date(2026, 2, 23), date(2026, 2, 20));
        assert!(matches!(result, Err(IngestError::InvalidDateRange { .. })));
    }
}
