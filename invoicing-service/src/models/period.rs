//! Date ranges used by summaries and exports.
//!
//! Dates are stored as ISO `YYYY-MM-DD` text, so ranges are inclusive string bounds.

use chrono::NaiveDate;

const ISO_DATE: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE).ok()
}

/// Inclusive text bounds over the `date` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.format(ISO_DATE).to_string(),
            end: end.format(ISO_DATE).to_string(),
        }
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPeriod {
    pub month: u32,
    pub year: i32,
}

impl MonthPeriod {
    pub fn new(month: u32, year: i32) -> Option<Self> {
        if (1..=12).contains(&month) && (1..=9999).contains(&year) {
            Some(Self { month, year })
        } else {
            None
        }
    }

    /// Day 01 through day 31 regardless of month length. Any stored date in the
    /// month sorts inside these bounds.
    pub fn range(&self) -> DateRange {
        DateRange {
            start: format!("{:04}-{:02}-01", self.year, self.month),
            end: format!("{:04}-{:02}-31", self.year, self.month),
        }
    }
}
