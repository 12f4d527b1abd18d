use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::errors::{StoreError, TrackerError};

/// A closed date range `[start, end]` a report is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Window {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self, TrackerError> {
        let label = label.into();
        if start > end {
            return Err(TrackerError::InvalidWindow(format!(
                "'{label}' starts {start} after it ends {end}"
            )));
        }
        Ok(Self { label, start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A window as configured: a label plus how many days back it reaches.
/// `seven_day=7` becomes `[today - 7, today]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub label: String,
    pub days: u32,
}

impl WindowSpec {
    pub fn defaults() -> Vec<WindowSpec> {
        [("one_day", 1), ("seven_day", 7), ("thirty_day", 30)]
            .into_iter()
            .map(|(label, days)| WindowSpec {
                label: label.to_string(),
                days,
            })
            .collect()
    }

    pub fn ending_on(&self, today: NaiveDate) -> Result<Window, TrackerError> {
        let start = today
            .checked_sub_signed(Duration::days(i64::from(self.days)))
            .ok_or_else(|| {
                TrackerError::InvalidWindow(format!("'{}' reaches before year 1", self.label))
            })?;
        Window::new(self.label.clone(), start, today)
    }

    pub fn report_name(&self) -> Result<ReportName, StoreError> {
        ReportName::new(format!("{}_favorite_diff", self.label))
    }
}

impl FromStr for WindowSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, days) = s
            .split_once('=')
            .ok_or_else(|| format!("expected label=days, got '{s}'"))?;
        let label = label.trim();
        if !is_identifier(label) {
            return Err(format!(
                "window label '{label}' must be lowercase letters, digits and underscores"
            ));
        }
        let days = days
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("window '{label}' needs a whole number of days, got '{days}'"))?;
        Ok(WindowSpec {
            label: label.to_string(),
            days,
        })
    }
}

/// Name of a materialized report table. Table names cannot be bound as
/// query parameters, so this is the only validated token spliced into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportName(String);

impl ReportName {
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        if is_identifier(&name) && name.len() <= 63 {
            Ok(Self(name))
        } else {
            Err(StoreError::InvalidReportName(name))
        }
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
