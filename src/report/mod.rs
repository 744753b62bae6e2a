//! Accounting reports and dashboard statistics.
//!
//! A report aggregates one user's sales over an inclusive date range:
//! totals, top products/channels/clients and the detail listing. It is
//! recomputed from source rows on every request and rendered either as
//! JSON or as a three-sheet spreadsheet.

pub mod dashboard;
pub mod excel;
pub mod models;
mod queries;
pub mod range;

use tracing::info;

use crate::db::DbHandle;
use crate::errors::{CopilotError, ReportError};

pub use dashboard::{StatsFilter, StatsParams};
pub use models::{Report, ReportSummary, SaleDetail, TopEntry};
pub use range::DateRange;

/// Default number of entries in each top-N table.
pub const DEFAULT_TOP_N: usize = 10;

/// Output format of `/api/rapport-data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    #[default]
    Excel,
}

impl std::str::FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "excel" | "xlsx" => Ok(Self::Excel),
            _ => Err(ReportError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl ReportFormat {
    /// Parse an optional `format` parameter; absent or blank means Excel.
    pub fn from_param(value: Option<&str>) -> Result<Self, ReportError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(v) => v.parse(),
        }
    }
}

/// Builds accounting reports against the shared database.
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    top_n: usize,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl ReportBuilder {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub async fn build(
        &self,
        db: &DbHandle,
        owner: i64,
        range: DateRange,
    ) -> Result<Report, CopilotError> {
        let top_n = self.top_n;
        let report = db
            .call(move |db| db.accounting_report(owner, range, top_n))
            .await
            .map_err(CopilotError::Storage)?;
        info!(
            owner,
            start = %range.start,
            end = %range.end,
            sales = report.sales.len(),
            "Built accounting report"
        );
        Ok(report)
    }

    /// Build the report and render it as an `.xlsx` workbook.
    pub async fn build_workbook(
        &self,
        db: &DbHandle,
        owner: i64,
        range: DateRange,
    ) -> Result<Vec<u8>, CopilotError> {
        let report = self.build(db, owner, range).await?;
        tokio::task::spawn_blocking(move || excel::render_workbook(&report))
            .await
            .map_err(|e| CopilotError::Export(anyhow::Error::new(e)))?
            .map_err(|e| CopilotError::Export(anyhow::Error::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CopilotDb, NewSale};

    #[test]
    fn test_format_parsing() {
        assert_eq!(ReportFormat::from_param(None), Ok(ReportFormat::Excel));
        assert_eq!(ReportFormat::from_param(Some("")), Ok(ReportFormat::Excel));
        assert_eq!(ReportFormat::from_param(Some("JSON")), Ok(ReportFormat::Json));
        assert_eq!(ReportFormat::from_param(Some("excel")), Ok(ReportFormat::Excel));
        assert_eq!(
            ReportFormat::from_param(Some("pdf")),
            Err(ReportError::UnsupportedFormat {
                format: "pdf".into()
            })
        );
    }

    #[tokio::test]
    async fn test_builder_limits_top_tables() {
        let db = CopilotDb::new_in_memory().unwrap();
        let owner = db.create_user("m@example.com", "M", "K").unwrap();
        for i in 0..4 {
            let canal = db.create_sales_channel(owner, &format!("canal {}", i)).unwrap();
            db.create_sale(
                owner,
                &NewSale {
                    canal_id: Some(canal),
                    price: 10.0 * (i + 1) as f64,
                    created_at: Some("2024-03-10 12:00:00".into()),
                    ..Default::default()
                },
                &[],
            )
            .unwrap();
        }
        let handle = DbHandle::new(db);
        let range = DateRange::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();

        let report = ReportBuilder::new(2).build(&handle, owner, range).await.unwrap();
        assert_eq!(report.summary.count_sales, 4);
        assert_eq!(report.top_channels.len(), 2);
        assert_eq!(report.top_channels[0].name, "canal 3");

        let bytes = ReportBuilder::default()
            .build_workbook(&handle, owner, range)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
