//! Calendar handling: start-date validation and the inclusive day range

use chrono::{Local, NaiveDate};

use crate::utils::{ScraperError, ScraperResult};

/// Parse a `YYYY-MM-DD` start date
pub fn parse_start_date(raw: &str) -> ScraperResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ScraperError::InvalidStartDate(raw.to_string()))
}

/// Today's date in the local timezone
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse the start date and check it is not after `today`
pub fn validate_start(raw: &str, today: NaiveDate) -> ScraperResult<NaiveDate> {
    let start = parse_start_date(raw)?;
    if start > today {
        return Err(ScraperError::FutureStartDate { start, today });
    }
    Ok(start)
}

/// Date format typed into the page's as-of field
pub fn to_mmddyyyy(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Inclusive, ascending run of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ScraperResult<Self> {
        if start > end {
            return Err(ScraperError::FutureStartDate { start, today: end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// A range always holds at least its start day.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_start_date("2025-01-17").unwrap(), ymd(2025, 1, 17));
        assert!(matches!(
            parse_start_date("01/17/2025"),
            Err(ScraperError::InvalidStartDate(_))
        ));
        assert!(parse_start_date("2025-02-30").is_err());
    }

    #[test]
    fn rejects_future_start() {
        let today = ymd(2025, 3, 1);
        assert_eq!(validate_start("2025-03-01", today).unwrap(), today);
        let err = validate_start("2025-03-02", today).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn formats_for_the_date_field() {
        assert_eq!(to_mmddyyyy(ymd(2025, 1, 7)), "01/07/2025");
    }

    #[test]
    fn range_is_inclusive_and_ascending() {
        let range = DateRange::new(ymd(2024, 2, 27), ymd(2024, 3, 1)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(
            days,
            vec![ymd(2024, 2, 27), ymd(2024, 2, 28), ymd(2024, 2, 29), ymd(2024, 3, 1)]
        );
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn single_day_range() {
        let day = ymd(2025, 6, 30);
        let range = DateRange::new(day, day).unwrap();
        assert_eq!(range.days().collect::<Vec<_>>(), vec![day]);
    }
}
