use serde::{Serialize, Serializer};

use super::range::DateRange;

/// Totals over every sale in the range. All zero when nothing matches.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub sum_price: f64,
    pub sum_benefit: f64,
    pub sum_commission: f64,
    pub sum_time: f64,
    pub sum_ursaf: f64,
    pub sum_expense: f64,
    pub count_sales: i64,
    pub count_products: i64,
    pub count_clients: i64,
}

/// One row of a top-N table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopEntry {
    pub name: String,
    pub count: i64,
    pub total: f64,
}

/// A sale in the detail listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub products: Vec<String>,
    /// Client of the first sale line.
    pub client: Option<String>,
    pub canal: Option<String>,
    pub price: f64,
    pub benefit: f64,
    pub commission: f64,
    pub ursaf: f64,
    pub expense: f64,
    pub time: f64,
    pub nb_product: Option<f64>,
}

/// Full accounting report for one user and date range.
///
/// Serializes to the JSON payload served by `/api/rapport-data`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Report {
    #[serde(skip)]
    pub range: DateRange,
    #[serde(rename = "dataPriceDateOne", serialize_with = "single_element")]
    pub summary: ReportSummary,
    #[serde(rename = "topClientSale")]
    pub top_clients: Vec<TopEntry>,
    #[serde(rename = "topCanalSale")]
    pub top_channels: Vec<TopEntry>,
    #[serde(rename = "topProductSale")]
    pub top_products: Vec<TopEntry>,
    pub sales: Vec<SaleDetail>,
}

// Dashboard clients read the summary as a one-element array.
fn single_element<S: Serializer>(summary: &ReportSummary, serializer: S) -> Result<S::Ok, S::Error> {
    [summary].serialize(serializer)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenuePoint {
    pub month: u32,
    pub revenue: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub sales_count: i64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopChannel {
    pub channel_id: i64,
    pub channel_name: String,
    pub products_count: i64,
    pub revenue: f64,
    pub profit: f64,
    pub rank: usize,
}

/// Revenue and margin of one month next to the month before it.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AverageBenefit {
    pub revenue: f64,
    pub benefit_amount: f64,
    pub benefit_percent: f64,
    pub previous_revenue: f64,
    pub previous_benefit_amount: f64,
    pub previous_benefit_percent: f64,
}

/// Revenue and benefit totals for one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthTotals {
    pub revenue: f64,
    pub benefit: f64,
}

impl MonthTotals {
    /// Benefit as a percentage of revenue, zero without revenue.
    pub fn benefit_percent(&self) -> f64 {
        if self.revenue > 0.0 {
            self.benefit / self.revenue * 100.0
        } else {
            0.0
        }
    }
}

impl AverageBenefit {
    pub fn compare(current: MonthTotals, previous: MonthTotals) -> Self {
        Self {
            revenue: current.revenue,
            benefit_amount: current.benefit,
            benefit_percent: current.benefit_percent(),
            previous_revenue: previous.revenue,
            previous_benefit_amount: previous.benefit,
            previous_benefit_percent: previous.benefit_percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestSale {
    pub id: i64,
    pub name: String,
    pub nb_product: i64,
    pub canal_name: String,
    pub price: f64,
    pub benefit: f64,
    /// RFC 3339, UTC.
    pub created_at: String,
}

/// Revenue of a period measured against the user's monthly objective,
/// broken down by product.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueObjectives {
    pub total: f64,
    pub profit: f64,
    pub objective: Option<i64>,
    pub objective_percent: Option<f64>,
    pub products: Vec<ProductShare>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductShare {
    pub product_id: i64,
    pub product_name: String,
    pub amount: f64,
    pub percent: f64,
    pub profit_amount: f64,
}
