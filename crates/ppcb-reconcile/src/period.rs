//! Calendar handling for work-log dates: parsing, inclusive periods and
//! per-period restriction of entries.

use chrono::{Datelike, Months, NaiveDate};
use ppcb_core::WorkLogEntry;
use serde::{Deserialize, Serialize};

use crate::ReconcileError;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Parses the date part of a work-log date cell. A trailing time component
/// (`2026-02-05T10:00`, `05/02/2026 10:00`) is ignored.
pub fn parse_log_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReconcileError> {
        if start > end {
            return Err(ReconcileError::InvalidPeriod(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Option<Self> {
        let start = date.with_day(1)?;
        let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(Self { start, end })
    }

    /// Parses `YYYY-MM` into that whole month.
    pub fn parse_month(text: &str) -> Result<Self, ReconcileError> {
        let text = text.trim();
        NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d")
            .ok()
            .and_then(Self::month_of)
            .ok_or_else(|| ReconcileError::InvalidPeriod(format!("`{text}` is not YYYY-MM")))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Entries whose date parses and falls inside `period`. Undated or
/// unparseable entries cannot be placed in any period and are dropped.
pub fn restrict_to_period(entries: &[WorkLogEntry], period: &Period) -> Vec<WorkLogEntry> {
    entries
        .iter()
        .filter(|entry| parse_log_date(&entry.date).is_some_and(|d| period.contains(d)))
        .cloned()
        .collect()
}
