//! Calendar month periods used to key provisions.
//!
//! Months are 0-based (0 = January) everywhere inside the crate. Only the CSV
//! format uses 1-based calendar months.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A `(month, year)` pair identifying one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

/// Period as sent by clients; missing parts default to the current month.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PeriodInput {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Inclusive bounds of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthRange {
    /// First day formatted for comparison against ledger dates.
    pub fn start_date(&self) -> String {
        self.start.date().format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.date().format("%Y-%m-%d").to_string()
    }
}

impl Period {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }

    /// Rejects months outside 0-11 and years chrono cannot represent.
    pub fn validate(self) -> AppResult<Self> {
        if self.month > 11 {
            return Err(AppError::Validation(format!(
                "Month must be between 0 and 11, got {}",
                self.month
            )));
        }
        if NaiveDate::from_ymd_opt(self.year, 1, 1).is_none() {
            return Err(AppError::Validation(format!("Invalid year {}", self.year)));
        }
        Ok(self)
    }

    pub fn prev(self) -> Self {
        if self.month == 0 {
            Self::new(11, self.year - 1)
        } else {
            Self::new(self.month - 1, self.year)
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 11 {
            Self::new(0, self.year + 1)
        } else {
            Self::new(self.month + 1, self.year)
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month + 1)
    }
}

/// Fill missing fields from the current local date.
pub fn resolve_period(input: Option<PeriodInput>) -> Period {
    resolve_period_at(input, Local::now().date_naive())
}

pub fn resolve_period_at(input: Option<PeriodInput>, today: NaiveDate) -> Period {
    let input = input.unwrap_or_default();
    Period {
        month: input.month.unwrap_or_else(|| today.month0()),
        year: input.year.unwrap_or_else(|| today.year()),
    }
}

/// First and last instant of the period's month.
///
/// The end is taken as day 0 of the following month, i.e. the last day of
/// this one, at 23:59:59.999. Out-of-range periods collapse to the current month.
pub fn create_month_range(period: Period) -> MonthRange {
    let start_date = NaiveDate::from_ymd_opt(period.year, period.month + 1, 1)
        .unwrap_or_else(|| first_of_month(Local::now().date_naive()));
    let next = Period::new(start_date.month0(), start_date.year()).next();
    let end_date = NaiveDate::from_ymd_opt(next.year, next.month + 1, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(start_date);

    MonthRange {
        start: start_date.and_time(NaiveTime::MIN),
        end: end_date.and_time(
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
        ),
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_period_defaults_to_today() {
        let period = resolve_period_at(None, date(2024, 3, 17));
        assert_eq!(period, Period::new(2, 2024));
    }

    #[test]
    fn test_resolve_period_keeps_given_fields() {
        let input = PeriodInput {
            month: Some(0),
            year: None,
        };
        assert_eq!(
            resolve_period_at(Some(input), date(2023, 9, 1)),
            Period::new(0, 2023)
        );
    }

    #[test]
    fn test_resolve_period_does_not_validate() {
        let input = PeriodInput {
            month: Some(14),
            year: Some(2024),
        };
        assert_eq!(resolve_period_at(Some(input), date(2024, 1, 1)).month, 14);
    }

    #[test]
    fn test_month_range_february_leap_year() {
        let range = create_month_range(Period::new(1, 2024));
        assert_eq!(range.start_date(), "2024-02-01");
        assert_eq!(range.end_date(), "2024-02-29");
        assert_eq!(range.end.time().format("%H:%M:%S%.3f").to_string(), "23:59:59.999");
    }

    #[test]
    fn test_month_range_december() {
        let range = create_month_range(Period::new(11, 2023));
        assert_eq!(range.start_date(), "2023-12-01");
        assert_eq!(range.end_date(), "2023-12-31");
    }

    #[test]
    fn test_prev_and_next_wrap_years() {
        assert_eq!(Period::new(0, 2024).prev(), Period::new(11, 2023));
        assert_eq!(Period::new(11, 2023).next(), Period::new(0, 2024));
        assert_eq!(Period::new(5, 2024).prev(), Period::new(4, 2024));
    }

    #[test]
    fn test_validate_rejects_month_12() {
        assert!(Period::new(12, 2024).validate().is_err());
        assert!(Period::new(11, 2024).validate().is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Period::new(0, 2024).to_string(), "2024-01");
    }
}
