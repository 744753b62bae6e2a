//! Dashboard statistics: monthly revenue, best-selling products, best
//! channels, month-over-month margin, latest sales and progress towards
//! the revenue objective.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use super::models::{
    AverageBenefit, LatestSale, RevenueObjectives, RevenuePoint, TopChannel, TopProduct,
};
use crate::db::DbHandle;
use crate::errors::{CopilotError, ReportError};

pub const DEFAULT_TOP_PRODUCTS: i64 = 6;
pub const DEFAULT_TOP_CHANNELS: i64 = 5;
pub const DEFAULT_LATEST_SALES: i64 = 4;
const MAX_STATS_LIMIT: i64 = 100;

/// Raw `?month=&year=&limit=` query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsParams {
    pub month: Option<i64>,
    pub year: Option<i32>,
    pub limit: Option<i64>,
}

/// Validated period and size of a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub limit: i64,
}

impl StatsFilter {
    pub fn from_params(params: &StatsParams, default_limit: i64) -> Result<Self, ReportError> {
        let month = parse_month(params.month)?;
        let limit = params.limit.unwrap_or(default_limit);
        if !(1..=MAX_STATS_LIMIT).contains(&limit) {
            return Err(ReportError::OutOfRange {
                name: "limit",
                message: format!("expected 1-{}, got {}", MAX_STATS_LIMIT, limit),
            });
        }
        Ok(Self {
            month,
            year: params.year,
            limit,
        })
    }
}

fn parse_month(month: Option<i64>) -> Result<Option<u32>, ReportError> {
    match month {
        Some(m @ 1..=12) => Ok(Some(m as u32)),
        Some(m) => Err(ReportError::OutOfRange {
            name: "month",
            message: format!("expected 1-12, got {}", m),
        }),
        None => Ok(None),
    }
}

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPeriod {
    pub month: u32,
    pub year: i32,
}

impl MonthPeriod {
    /// Month and year from the query, each defaulting to `today`'s.
    pub fn from_params(params: &StatsParams, today: NaiveDate) -> Result<Self, ReportError> {
        Ok(Self {
            month: parse_month(params.month)?.unwrap_or_else(|| today.month()),
            year: params.year.unwrap_or_else(|| today.year()),
        })
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                month: 12,
                year: self.year - 1,
            }
        } else {
            Self {
                month: self.month - 1,
                year: self.year,
            }
        }
    }
}

pub async fn revenue_chart(
    db: &DbHandle,
    owner: i64,
    year: Option<i32>,
) -> Result<Vec<RevenuePoint>, CopilotError> {
    debug!(owner, ?year, "Computing revenue chart");
    db.call(move |db| db.revenue_by_month(owner, year))
        .await
        .map_err(CopilotError::Storage)
}

pub async fn top_products(
    db: &DbHandle,
    owner: i64,
    filter: StatsFilter,
) -> Result<Vec<TopProduct>, CopilotError> {
    debug!(owner, ?filter, "Computing top products");
    db.call(move |db| db.top_products_stats(owner, &filter))
        .await
        .map_err(CopilotError::Storage)
}

pub async fn top_channels(
    db: &DbHandle,
    owner: i64,
    filter: StatsFilter,
) -> Result<Vec<TopChannel>, CopilotError> {
    debug!(owner, ?filter, "Computing top channels");
    db.call(move |db| db.top_channels_stats(owner, &filter))
        .await
        .map_err(CopilotError::Storage)
}

pub async fn average_benefit(
    db: &DbHandle,
    owner: i64,
    period: MonthPeriod,
) -> Result<AverageBenefit, CopilotError> {
    debug!(owner, ?period, "Computing average benefit");
    let previous = period.previous();
    db.call(move |db| {
        let current = db.month_totals(owner, period.month, period.year)?;
        let previous = db.month_totals(owner, previous.month, previous.year)?;
        Ok(AverageBenefit::compare(current, previous))
    })
    .await
    .map_err(CopilotError::Storage)
}

pub async fn latest_sales(
    db: &DbHandle,
    owner: i64,
    limit: i64,
) -> Result<Vec<LatestSale>, CopilotError> {
    debug!(owner, limit, "Listing latest sales");
    db.call(move |db| db.latest_sales(owner, limit))
        .await
        .map_err(CopilotError::Storage)
}

pub async fn revenue_objectives(
    db: &DbHandle,
    owner: i64,
    filter: StatsFilter,
) -> Result<RevenueObjectives, CopilotError> {
    debug!(owner, ?filter, "Computing revenue objectives");
    db.call(move |db| db.revenue_objectives(owner, filter.month, filter.year))
        .await
        .map_err(CopilotError::Storage)
}
