use chrono::NaiveDate;

use crate::errors::ReportError;

const INPUT_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-day range of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvertedRange {
                start: start.format(INPUT_FORMAT).to_string(),
                end: end.format(INPUT_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse the `date1`/`date2` query parameters.
    pub fn parse(date1: Option<&str>, date2: Option<&str>) -> Result<Self, ReportError> {
        let start = parse_date("date1", date1)?;
        let end = parse_date("date2", date2)?;
        Self::new(start, end)
    }

    /// Lower bound in storage timestamp format (`YYYY-MM-DD 00:00:00`).
    pub fn start_bound(&self) -> String {
        format!("{} 00:00:00", self.start.format(INPUT_FORMAT))
    }

    /// Upper bound in storage timestamp format (`YYYY-MM-DD 23:59:59`).
    pub fn end_bound(&self) -> String {
        format!("{} 23:59:59", self.end.format(INPUT_FORMAT))
    }

    /// Human label, e.g. `01/03/2024 - 31/03/2024`.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }

    pub fn export_filename(&self) -> String {
        format!(
            "rapport_comptable_{}_{}.xlsx",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

fn parse_date(name: &'static str, value: Option<&str>) -> Result<NaiveDate, ReportError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ReportError::MissingParameter { name })?;
    NaiveDate::parse_from_str(value, INPUT_FORMAT).map_err(|_| ReportError::InvalidDate {
        value: value.to_string(),
    })
}
