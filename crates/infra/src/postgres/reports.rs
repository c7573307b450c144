use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use stockroom_core::{Money, ProductId};
use stockroom_inventory::StockReportRow;

use super::{PgStore, count, map_sqlx_error};
use crate::error::StoreResult;
use crate::reports::{
    DashboardCounts, DashboardSummary, MonthSummary, MonthTotals, TopProduct, chart_months,
    month_start, monthly_series, rank_top_products,
};
use crate::store::ReportRepository;

const MONTH_TOTALS: &str = r#"
    SELECT month, SUM(purchases)::BIGINT AS purchases, SUM(sales)::BIGINT AS sales,
           SUM(expenses)::BIGINT AS expenses
    FROM (
        SELECT date_trunc('month', received_on)::date AS month, total AS purchases,
               0::BIGINT AS sales, 0::BIGINT AS expenses
        FROM goods_receives WHERE received_on BETWEEN $1 AND $2
        UNION ALL
        SELECT date_trunc('month', issued_on)::date, 0, total, 0
        FROM stock_outs WHERE issued_on BETWEEN $1 AND $2
        UNION ALL
        SELECT date_trunc('month', spent_on)::date, 0, 0, amount
        FROM expenses WHERE spent_on BETWEEN $1 AND $2
    ) movements
    GROUP BY month
"#;

impl PgStore {
    /// Totals per month for the months in `months` (first days, ascending).
    async fn month_totals(&self, months: &[NaiveDate]) -> StoreResult<HashMap<NaiveDate, MonthTotals>> {
        let (Some(first), Some(last)) = (months.first(), months.last()) else {
            return Ok(HashMap::new());
        };
        let end = last
            .checked_add_months(chrono::Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(*last);

        let rows = sqlx::query(MONTH_TOTALS)
            .bind(*first)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("month_totals", e))?;

        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            totals.insert(
                row.try_get::<NaiveDate, _>("month")?,
                MonthTotals {
                    purchases: Money::from_minor(row.try_get("purchases")?),
                    sales: Money::from_minor(row.try_get("sales")?),
                    expenses: Money::from_minor(row.try_get("expenses")?),
                },
            );
        }
        Ok(totals)
    }
}

#[async_trait]
impl ReportRepository for PgStore {
    async fn dashboard_summary(&self, today: NaiveDate) -> StoreResult<DashboardSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products) AS products,
                (SELECT COUNT(*) FROM suppliers) AS suppliers,
                (SELECT COUNT(*) FROM employees) AS employees,
                (SELECT COUNT(*) FROM products WHERE stock > 0 AND stock <= reorder_level) AS low_stock,
                (SELECT COUNT(*) FROM products WHERE stock <= 0) AS out_of_stock,
                (SELECT COALESCE(SUM(cost_price * GREATEST(stock, 0)), 0)::BIGINT FROM products) AS stock_value,
                (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_summary", e))?;

        let counts = DashboardCounts {
            products: count(row.try_get("products")?),
            suppliers: count(row.try_get("suppliers")?),
            employees: count(row.try_get("employees")?),
            low_stock: count(row.try_get("low_stock")?),
            out_of_stock: count(row.try_get("out_of_stock")?),
            stock_value: Money::from_minor(row.try_get("stock_value")?),
            pending_orders: count(row.try_get("pending_orders")?),
        };

        let month = month_start(today);
        let totals = self.month_totals(&[month]).await?;
        Ok(DashboardSummary::new(
            counts,
            month,
            totals.get(&month).copied().unwrap_or_default(),
        )?)
    }

    async fn monthly_chart(&self, today: NaiveDate, months: u32) -> StoreResult<Vec<MonthSummary>> {
        let months = chart_months(today, months);
        let totals = self.month_totals(&months).await?;
        Ok(monthly_series(&months, &totals)?)
    }

    async fn top_products(&self, limit: u32) -> StoreResult<Vec<TopProduct>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.code, p.name,
                   SUM(i.quantity)::BIGINT AS quantity,
                   SUM(i.line_total)::BIGINT AS revenue
            FROM stock_out_items i
            JOIN products p ON p.id = i.product_id
            GROUP BY p.id, p.code, p.name
            ORDER BY quantity DESC, revenue DESC, p.name
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("top_products", e))?;

        let mut ranked = Vec::with_capacity(rows.len());
        for row in rows {
            ranked.push(TopProduct {
                product_id: ProductId::from_uuid(row.try_get("id")?),
                code: row.try_get("code")?,
                name: row.try_get("name")?,
                quantity: row.try_get("quantity")?,
                revenue: Money::from_minor(row.try_get("revenue")?),
            });
        }
        Ok(rank_top_products(ranked, limit))
    }

    async fn stock_rows(&self) -> StoreResult<Vec<StockReportRow>> {
        let rows = sqlx::query(
            "SELECT id, code, name, category, unit, stock, reorder_level, cost_price FROM products",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_rows", e))?;

        let mut report = Vec::with_capacity(rows.len());
        for row in rows {
            report.push(StockReportRow::new(
                ProductId::from_uuid(row.try_get("id")?),
                row.try_get("code")?,
                row.try_get("name")?,
                row.try_get("category")?,
                row.try_get("unit")?,
                row.try_get("stock")?,
                row.try_get("reorder_level")?,
                Money::from_minor(row.try_get("cost_price")?),
            )?);
        }
        Ok(report)
    }
}
