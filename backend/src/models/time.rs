//! Day-of-year helpers for cross-year phenology statistics.

use chrono::{Datelike, Duration, NaiveDate};

/// Length of the circle day-of-year values live on.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Day of year, 1 = Jan 1.
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Date in `year` for a (possibly fractional) day of year.
///
/// The day is rounded and clamped to the length of `year`, so day 366 maps
/// to Dec 31 in non-leap years.
pub fn date_from_day_of_year(year: i32, doy: f64) -> Option<NaiveDate> {
    if !doy.is_finite() {
        return None;
    }
    let max = days_in_year(year) as f64;
    let day = doy.round().clamp(1.0, max) as u32;
    NaiveDate::from_yo_opt(year, day)
}

/// Shift a date by a signed number of days.
pub fn offset_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_of_year() {
        assert_eq!(day_of_year(date(2023, 1, 1)), 1);
        assert_eq!(day_of_year(date(2023, 12, 31)), 365);
        assert_eq!(day_of_year(date(2024, 12, 31)), 366);
    }

    #[test]
    fn test_days_in_year() {
        assert_eq!(days_in_year(2023), 365);
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(days_in_year(1900), 365);
        assert_eq!(days_in_year(2000), 366);
    }

    #[test]
    fn test_date_from_day_of_year_rounds() {
        assert_eq!(date_from_day_of_year(2023, 71.25), Some(date(2023, 3, 12)));
        assert_eq!(date_from_day_of_year(2023, 71.6), Some(date(2023, 3, 13)));
    }

    #[test]
    fn test_date_from_day_of_year_clamps() {
        assert_eq!(date_from_day_of_year(2023, 366.0), Some(date(2023, 12, 31)));
        assert_eq!(date_from_day_of_year(2023, 0.2), Some(date(2023, 1, 1)));
        assert_eq!(date_from_day_of_year(2023, f64::NAN), None);
    }

    #[test]
    fn test_offset_days_crosses_year() {
        assert_eq!(offset_days(date(2023, 12, 28), 5), date(2024, 1, 2));
        assert_eq!(offset_days(date(2024, 1, 2), -5), date(2023, 12, 28));
    }
}
