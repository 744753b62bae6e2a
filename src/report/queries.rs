//! Report and dashboard reads. All filters bind the owner id as `?1`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, params};

use super::dashboard::StatsFilter;
use super::models::{
    LatestSale, MonthTotals, ProductShare, Report, ReportSummary, RevenueObjectives, RevenuePoint,
    SaleDetail, TopChannel, TopEntry, TopProduct,
};
use super::range::DateRange;
use crate::db::CopilotDb;

const MONTH_EXPR: &str = "CAST(strftime('%m', s.created_at) AS INTEGER)";
const YEAR_EXPR: &str = "CAST(strftime('%Y', s.created_at) AS INTEGER)";

impl CopilotDb {
    /// Assemble the full accounting report for `owner` over `range`.
    pub fn accounting_report(&self, owner: i64, range: DateRange, top_n: usize) -> Result<Report> {
        Ok(Report {
            range,
            summary: self.report_summary(owner, &range)?,
            top_clients: self.top_clients_between(owner, &range, top_n)?,
            top_channels: self.top_channels_between(owner, &range, top_n)?,
            top_products: self.top_products_between(owner, &range, top_n)?,
            sales: self.sales_between(owner, &range)?,
        })
    }

    pub fn report_summary(&self, owner: i64, range: &DateRange) -> Result<ReportSummary> {
        let (start, end) = (range.start_bound(), range.end_bound());
        let mut summary = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(price), 0), COALESCE(SUM(benefit), 0),
                        COALESCE(SUM(commission), 0), COALESCE(SUM(time), 0),
                        COALESCE(SUM(ursaf), 0), COALESCE(SUM(expense), 0),
                        COUNT(DISTINCT id), CAST(COALESCE(SUM(nb_product), 0) AS INTEGER)
                 FROM sale
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at <= ?3",
                params![owner, start, end],
                |row| {
                    Ok(ReportSummary {
                        sum_price: row.get(0)?,
                        sum_benefit: row.get(1)?,
                        sum_commission: row.get(2)?,
                        sum_time: row.get(3)?,
                        sum_ursaf: row.get(4)?,
                        sum_expense: row.get(5)?,
                        count_sales: row.get(6)?,
                        count_products: row.get(7)?,
                        count_clients: 0,
                    })
                },
            )
            .context("Failed to compute report summary")?;

        summary.count_clients = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT sp.client_id)
                 FROM sales_product sp
                 JOIN sale s ON s.id = sp.sale_id
                 WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3",
                params![owner, start, end],
                |row| row.get(0),
            )
            .context("Failed to count report clients")?;
        Ok(summary)
    }

    pub fn top_products_between(
        &self,
        owner: i64,
        range: &DateRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>> {
        self.top_entries(
            "SELECT p.name, COUNT(sp.id) AS count, COALESCE(SUM(s.price), 0) AS total
             FROM sales_product sp
             JOIN sale s ON s.id = sp.sale_id
             JOIN product p ON p.id = sp.product_id
             WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
             GROUP BY p.id
             ORDER BY total DESC, p.id ASC
             LIMIT ?4",
            owner,
            range,
            limit,
        )
        .context("Failed to compute top products")
    }

    pub fn top_channels_between(
        &self,
        owner: i64,
        range: &DateRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>> {
        self.top_entries(
            "SELECT c.name, COUNT(s.id) AS count, COALESCE(SUM(s.price), 0) AS total
             FROM sale s
             JOIN sales_channel c ON c.id = s.canal_id
             WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
             GROUP BY c.id
             ORDER BY total DESC, c.id ASC
             LIMIT ?4",
            owner,
            range,
            limit,
        )
        .context("Failed to compute top channels")
    }

    pub fn top_clients_between(
        &self,
        owner: i64,
        range: &DateRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>> {
        self.top_entries(
            "SELECT cl.name, COUNT(sp.id) AS count, COALESCE(SUM(s.price), 0) AS total
             FROM sales_product sp
             JOIN sale s ON s.id = sp.sale_id
             JOIN client cl ON cl.id = sp.client_id
             WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
             GROUP BY cl.id
             ORDER BY total DESC, cl.id ASC
             LIMIT ?4",
            owner,
            range,
            limit,
        )
        .context("Failed to compute top clients")
    }

    fn top_entries(
        &self,
        sql: &str,
        owner: i64,
        range: &DateRange,
        limit: usize,
    ) -> Result<Vec<TopEntry>> {
        let limit = i64::try_from(limit).context("top-N limit does not fit in an SQL integer")?;
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(
            params![owner, range.start_bound(), range.end_bound(), limit],
            |row| {
                Ok(TopEntry {
                    name: row.get(0)?,
                    count: row.get(1)?,
                    total: row.get(2)?,
                })
            },
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Sales in range, oldest first, with their product names and first client.
    pub fn sales_between(&self, owner: i64, range: &DateRange) -> Result<Vec<SaleDetail>> {
        let (start, end) = (range.start_bound(), range.end_bound());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id, s.name, s.created_at, c.name, s.price, s.benefit,
                        s.commission, s.ursaf, s.expense, s.time, s.nb_product
                 FROM sale s
                 LEFT JOIN sales_channel c ON c.id = s.canal_id
                 WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
                 ORDER BY s.created_at ASC, s.id ASC",
            )
            .context("Failed to prepare sales_between")?;
        let mut sales = stmt
            .query_map(params![owner, start, end], |row| {
                Ok(SaleDetail {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    products: Vec::new(),
                    client: None,
                    canal: row.get(3)?,
                    price: row.get(4)?,
                    benefit: row.get(5)?,
                    commission: row.get(6)?,
                    ursaf: row.get(7)?,
                    expense: row.get(8)?,
                    time: row.get(9)?,
                    nb_product: row.get(10)?,
                })
            })
            .context("Failed to query sales")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read sale rows")?;

        let mut by_id: HashMap<i64, usize> = HashMap::with_capacity(sales.len());
        for (idx, sale) in sales.iter().enumerate() {
            by_id.insert(sale.id, idx);
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT sp.sale_id, p.name, cl.name
                 FROM sales_product sp
                 JOIN sale s ON s.id = sp.sale_id
                 JOIN product p ON p.id = sp.product_id
                 LEFT JOIN client cl ON cl.id = sp.client_id
                 WHERE s.user_id = ?1 AND s.created_at >= ?2 AND s.created_at <= ?3
                 ORDER BY sp.id ASC",
            )
            .context("Failed to prepare sale lines query")?;
        let lines = stmt
            .query_map(params![owner, start, end], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .context("Failed to query sale lines")?;

        // Lines arrive in insertion order, so the first one seen per sale
        // carries the sale's client.
        let mut client_seen: Vec<bool> = vec![false; sales.len()];
        for line in lines {
            let (sale_id, product, client) = line.context("Failed to read sale line")?;
            let Some(&idx) = by_id.get(&sale_id) else {
                continue;
            };
            sales[idx].products.push(product);
            if !client_seen[idx] {
                client_seen[idx] = true;
                sales[idx].client = client;
            }
        }
        Ok(sales)
    }

    /// Revenue and profit per calendar month, all twelve months present.
    pub fn revenue_by_month(&self, owner: i64, year: Option<i32>) -> Result<Vec<RevenuePoint>> {
        let sql = format!(
            "SELECT {month} AS month, COALESCE(SUM(s.price), 0), COALESCE(SUM(s.benefit), 0)
             FROM sale s
             WHERE s.user_id = ?1 AND (?2 IS NULL OR {year} = ?2)
             GROUP BY month",
            month = MONTH_EXPR,
            year = YEAR_EXPR,
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare revenue_by_month")?;
        let rows = stmt
            .query_map(params![owner, year], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .context("Failed to query monthly revenue")?;

        let mut points: Vec<RevenuePoint> = (1..=12)
            .map(|month| RevenuePoint {
                month,
                revenue: 0.0,
                profit: 0.0,
            })
            .collect();
        for row in rows {
            let (month, revenue, profit) = row.context("Failed to read revenue row")?;
            if let Some(point) = points.get_mut(month.saturating_sub(1) as usize) {
                point.revenue = revenue;
                point.profit = profit;
            }
        }
        Ok(points)
    }

    /// Products ranked by number of sale lines.
    pub fn top_products_stats(&self, owner: i64, filter: &StatsFilter) -> Result<Vec<TopProduct>> {
        let sql = format!(
            "SELECT p.id, p.name, COUNT(sp.id) AS sales_count
             FROM sales_product sp
             JOIN product p ON p.id = sp.product_id
             JOIN sale s ON s.id = sp.sale_id
             WHERE s.user_id = ?1
               AND (?2 IS NULL OR {month} = ?2)
               AND (?3 IS NULL OR {year} = ?3)
             GROUP BY p.id, p.name
             ORDER BY sales_count DESC, p.id ASC
             LIMIT ?4",
            month = MONTH_EXPR,
            year = YEAR_EXPR,
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare top_products_stats")?;
        let rows = stmt
            .query_map(
                params![owner, filter.month, filter.year, filter.limit],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .context("Failed to query top products")?;

        let mut ranked = Vec::new();
        for (idx, row) in rows.enumerate() {
            let (product_id, product_name, sales_count) =
                row.context("Failed to read top product row")?;
            ranked.push(TopProduct {
                product_id,
                product_name,
                sales_count,
                rank: idx + 1,
            });
        }
        Ok(ranked)
    }

    /// Sales channels ranked by revenue.
    pub fn top_channels_stats(&self, owner: i64, filter: &StatsFilter) -> Result<Vec<TopChannel>> {
        let sql = format!(
            "SELECT sc.id, sc.name, CAST(COALESCE(SUM(s.nb_product), 0) AS INTEGER),
                    COALESCE(SUM(s.price), 0) AS revenue, COALESCE(SUM(s.benefit), 0)
             FROM sale s
             JOIN sales_channel sc ON sc.id = s.canal_id
             WHERE s.user_id = ?1
               AND (?2 IS NULL OR {month} = ?2)
               AND (?3 IS NULL OR {year} = ?3)
             GROUP BY sc.id, sc.name
             ORDER BY revenue DESC, sc.id ASC
             LIMIT ?4",
            month = MONTH_EXPR,
            year = YEAR_EXPR,
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare top_channels_stats")?;
        let rows = stmt
            .query_map(
                params![owner, filter.month, filter.year, filter.limit],
                |row| {
                    Ok(TopChannel {
                        channel_id: row.get(0)?,
                        channel_name: row.get(1)?,
                        products_count: row.get(2)?,
                        revenue: row.get(3)?,
                        profit: row.get(4)?,
                        rank: 0,
                    })
                },
            )
            .context("Failed to query top channels")?;

        let mut ranked = Vec::new();
        for (idx, row) in rows.enumerate() {
            let mut channel = row.context("Failed to read top channel row")?;
            channel.rank = idx + 1;
            ranked.push(channel);
        }
        Ok(ranked)
    }

    /// Revenue and benefit of sales created in `month` of `year`.
    pub fn month_totals(&self, owner: i64, month: u32, year: i32) -> Result<MonthTotals> {
        let sql = format!(
            "SELECT COALESCE(SUM(s.price), 0), COALESCE(SUM(s.benefit), 0)
             FROM sale s
             WHERE s.user_id = ?1 AND {month} = ?2 AND {year} = ?3",
            month = MONTH_EXPR,
            year = YEAR_EXPR,
        );
        self.conn
            .query_row(&sql, params![owner, month, year], |row| {
                Ok(MonthTotals {
                    revenue: row.get(0)?,
                    benefit: row.get(1)?,
                })
            })
            .context("Failed to compute month totals")
    }

    /// Most recent sales first, with their channel name.
    pub fn latest_sales(&self, owner: i64, limit: i64) -> Result<Vec<LatestSale>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id, s.name, CAST(COALESCE(s.nb_product, 0) AS INTEGER),
                        COALESCE(sc.name, 'N/A'), s.price, s.benefit, s.created_at
                 FROM sale s
                 LEFT JOIN sales_channel sc ON sc.id = s.canal_id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC
                 LIMIT ?2",
            )
            .context("Failed to prepare latest_sales")?;
        let rows = stmt
            .query_map(params![owner, limit], |row| {
                Ok(LatestSale {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    nb_product: row.get(2)?,
                    canal_name: row.get(3)?,
                    price: row.get(4)?,
                    benefit: row.get(5)?,
                    created_at: rfc3339(&row.get::<_, String>(6)?),
                })
            })
            .context("Failed to query latest sales")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read latest sale rows")
    }

    /// Period revenue against the user's monthly objective. A sale with
    /// several lines splits its price evenly across its products.
    pub fn revenue_objectives(
        &self,
        owner: i64,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<RevenueObjectives> {
        let period = format!(
            "(?2 IS NULL OR {month} = ?2) AND (?3 IS NULL OR {year} = ?3)",
            month = MONTH_EXPR,
            year = YEAR_EXPR,
        );
        let (total, profit): (f64, f64) = self
            .conn
            .query_row(
                &format!(
                    "SELECT COALESCE(SUM(s.price), 0), COALESCE(SUM(s.benefit), 0)
                     FROM sale s
                     WHERE s.user_id = ?1 AND {period}"
                ),
                params![owner, month, year],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to compute period revenue")?;

        let objective: Option<i64> = self
            .conn
            .query_row(
                "SELECT objective_value FROM app_user WHERE id = ?1",
                params![owner],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .context("Failed to read revenue objective")?
            .flatten();

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT p.id, p.name, SUM(s.price / lc.n) AS amount, SUM(s.benefit / lc.n)
                 FROM sales_product sp
                 JOIN sale s ON s.id = sp.sale_id
                 JOIN product p ON p.id = sp.product_id
                 JOIN (SELECT sale_id, COUNT(*) AS n FROM sales_product GROUP BY sale_id) lc
                   ON lc.sale_id = s.id
                 WHERE s.user_id = ?1 AND {period}
                 GROUP BY p.id, p.name
                 ORDER BY amount DESC, p.id ASC"
            ))
            .context("Failed to prepare revenue_objectives")?;
        let products = stmt
            .query_map(params![owner, month, year], |row| {
                let amount: f64 = row.get(2)?;
                Ok(ProductShare {
                    product_id: row.get(0)?,
                    product_name: row.get(1)?,
                    amount,
                    percent: percent_of(amount, total),
                    profit_amount: row.get(3)?,
                })
            })
            .context("Failed to query product shares")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read product share rows")?;

        // The objective is monthly, so only a single month is measured against it.
        let objective_percent = match (month, objective) {
            (Some(_), Some(target)) if target > 0 => Some(percent_of(total, target as f64)),
            _ => None,
        };

        Ok(RevenueObjectives {
            total,
            profit,
            objective,
            objective_percent,
            products,
        })
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Storage timestamps are naive UTC `YYYY-MM-DD HH:MM:SS`.
fn rfc3339(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc().to_rfc3339())
        .unwrap_or_else(|_| raw.to_string())
}
