use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Money, ProductId};

/// Stock health of a product relative to its reorder level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    InStock,
}

impl StockStatus {
    pub fn classify(stock: i64, reorder_level: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= reorder_level {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            "low" => Ok(StockStatus::Low),
            "in_stock" => Ok(StockStatus::InStock),
            _ => Err(DomainError::validation(
                "status",
                "must be one of: out_of_stock, low, in_stock",
            )),
        }
    }

    /// True for products that need reordering.
    pub fn needs_attention(self) -> bool {
        !matches!(self, StockStatus::InStock)
    }
}

/// One product line of the stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReportRow {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    pub stock: i64,
    pub reorder_level: i64,
    pub cost_price: Money,
    pub status: StockStatus,
    pub stock_value: Money,
}

impl StockReportRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: ProductId,
        code: String,
        name: String,
        category: Option<String>,
        unit: String,
        stock: i64,
        reorder_level: i64,
        cost_price: Money,
    ) -> DomainResult<Self> {
        Ok(Self {
            status: StockStatus::classify(stock, reorder_level),
            stock_value: cost_price.times(stock.max(0))?,
            product_id,
            code,
            name,
            category,
            unit,
            stock,
            reorder_level,
            cost_price,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub products: u64,
    pub in_stock: u64,
    pub low: u64,
    pub out_of_stock: u64,
    pub total_units: i64,
    pub total_value: Money,
}

/// Stock report: rows filtered by status, summary over every product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub summary: StockSummary,
    pub rows: Vec<StockReportRow>,
}

impl StockReport {
    /// Build the report. The summary always covers all `rows`; the returned
    /// rows are narrowed to `status` when given. Rows sort lowest stock first.
    pub fn build(mut rows: Vec<StockReportRow>, status: Option<StockStatus>) -> DomainResult<Self> {
        let mut summary = StockSummary::default();
        for row in &rows {
            summary.products += 1;
            match row.status {
                StockStatus::InStock => summary.in_stock += 1,
                StockStatus::Low => summary.low += 1,
                StockStatus::OutOfStock => summary.out_of_stock += 1,
            }
            summary.total_units += row.stock.max(0);
            summary.total_value = summary.total_value.checked_add(row.stock_value)?;
        }

        if let Some(status) = status {
            rows.retain(|r| r.status == status);
        }
        rows.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        Ok(Self { summary, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, stock: i64, reorder: i64, cost: i64) -> StockReportRow {
        StockReportRow::new(
            ProductId::new(),
            name.to_uppercase(),
            name.to_string(),
            None,
            "pcs".into(),
            stock,
            reorder,
            Money::from_minor(cost),
        )
        .unwrap()
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::Low);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::classify(1, 0), StockStatus::InStock);
    }

    #[test]
    fn report_summary_covers_everything_and_rows_are_filtered() {
        let rows = vec![row("bolt", 100, 10, 25), row("nut", 3, 10, 10), row("washer", 0, 5, 5)];
        let report = StockReport::build(rows, Some(StockStatus::Low)).unwrap();

        assert_eq!(report.summary.products, 3);
        assert_eq!(report.summary.in_stock, 1);
        assert_eq!(report.summary.low, 1);
        assert_eq!(report.summary.out_of_stock, 1);
        assert_eq!(report.summary.total_units, 103);
        assert_eq!(report.summary.total_value, Money::from_minor(100 * 25 + 3 * 10));

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].name, "nut");
    }

    #[test]
    fn rows_sort_lowest_stock_first() {
        let rows = vec![row("b", 9, 1, 1), row("a", 2, 1, 1), row("c", 0, 1, 1)];
        let report = StockReport::build(rows, None).unwrap();
        let names: Vec<_> = report.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn parse_status() {
        assert_eq!(StockStatus::parse("low").unwrap(), StockStatus::Low);
        assert!(StockStatus::parse("LOW").is_err());
    }
}
