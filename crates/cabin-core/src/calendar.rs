//! Inclusive stay-length arithmetic at calendar-day granularity.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ValidationError;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct StayCalendar;

impl StayCalendar {
    /// Inclusive number of calendar days between `start` and `end`.
    ///
    /// A same-day stay counts as one day. Fails when `end` precedes `start`.
    pub fn days(start: NaiveDate, end: NaiveDate) -> Result<u32, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
        let span = (end - start).num_days();
        Ok(span as u32 + 1)
    }

    /// Same as [`StayCalendar::days`], ignoring any time-of-day component.
    pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> Result<u32, ValidationError> {
        Self::days(start.date(), end.date())
    }

    /// Parses a calendar day from `YYYY-MM-DD` or an ISO/RFC 3339 datetime,
    /// truncating the time of day.
    pub fn parse_day(raw: &str) -> Result<NaiveDate, ValidationError> {
        let trimmed = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
            return Ok(date);
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(stamp.date_naive());
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, pattern) {
                return Ok(stamp.date());
            }
        }
        Err(ValidationError::InvalidDate(trimmed.to_string()))
    }

    pub fn format_day(date: NaiveDate) -> String {
        date.format(DAY_FORMAT).to_string()
    }
}
