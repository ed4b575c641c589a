//! Calendar-date parsing and the inclusive analysis window.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use geolift_core::{GeoLiftError, GeoLiftResult};
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a normalized calendar date. Timestamps are truncated to their
/// date; anything else yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Build a window from caller-supplied strings. Unlike observation
    /// dates, an unparseable bound is an error.
    pub fn parse(start: &str, end: &str) -> GeoLiftResult<Self> {
        let parse = |raw: &str| {
            parse_date(raw).ok_or_else(|| GeoLiftError::InvalidDate(raw.trim().to_string()))
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered; zero when `end` precedes `start`.
    pub fn len_days(&self) -> u32 {
        let span = (self.end - self.start).num_days();
        if span < 0 {
            0
        } else {
            span as u32 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len_days() == 0
    }

    /// Every day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days()).filter_map(move |offset| {
            start.checked_add_days(chrono::Days::new(u64::from(offset)))
        })
    }
}
