//! Dashboard aggregates shared by both storage backends.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use stockroom_core::{DomainError, DomainResult, Money, ProductId};

pub const DEFAULT_CHART_MONTHS: u32 = 12;
pub const MAX_CHART_MONTHS: u32 = 24;
pub const DEFAULT_TOP_PRODUCTS: u32 = 5;
pub const MAX_TOP_PRODUCTS: u32 = 50;

/// Purchases, sales and expenses for one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    pub purchases: Money,
    pub sales: Money,
    pub expenses: Money,
}

impl MonthTotals {
    /// Sales minus purchases minus expenses.
    pub fn gross_profit(&self) -> DomainResult<Money> {
        self.sales.checked_sub(self.purchases)?.checked_sub(self.expenses)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`.
    pub month: String,
    pub purchases: Money,
    pub sales: Money,
    pub expenses: Money,
    pub gross_profit: Money,
}

impl MonthSummary {
    pub fn new(month_start: NaiveDate, totals: MonthTotals) -> DomainResult<Self> {
        Ok(Self {
            month: month_label(month_start),
            purchases: totals.purchases,
            sales: totals.sales,
            expenses: totals.expenses,
            gross_profit: totals.gross_profit()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub products: u64,
    pub suppliers: u64,
    pub employees: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub stock_value: Money,
    pub pending_orders: u64,
    pub current_month: MonthSummary,
}

/// Counts gathered by a backend before the summary is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub products: u64,
    pub suppliers: u64,
    pub employees: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub stock_value: Money,
    pub pending_orders: u64,
}

impl DashboardSummary {
    pub fn new(counts: DashboardCounts, month_start: NaiveDate, month: MonthTotals) -> DomainResult<Self> {
        Ok(Self {
            products: counts.products,
            suppliers: counts.suppliers,
            employees: counts.employees,
            low_stock: counts.low_stock,
            out_of_stock: counts.out_of_stock,
            stock_value: counts.stock_value,
            pending_orders: counts.pending_orders,
            current_month: MonthSummary::new(month_start, month)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// First days of the `count` months ending with the month of `today`,
/// oldest first.
pub fn chart_months(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let current = month_start(today);
    (0..count)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}

pub fn validate_months(months: Option<u32>) -> DomainResult<u32> {
    let months = months.unwrap_or(DEFAULT_CHART_MONTHS);
    if !(1..=MAX_CHART_MONTHS).contains(&months) {
        return Err(DomainError::validation(
            "months",
            format!("must be between 1 and {MAX_CHART_MONTHS}"),
        ));
    }
    Ok(months)
}

pub fn validate_top_limit(limit: Option<u32>) -> DomainResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_TOP_PRODUCTS);
    if !(1..=MAX_TOP_PRODUCTS).contains(&limit) {
        return Err(DomainError::validation(
            "limit",
            format!("must be between 1 and {MAX_TOP_PRODUCTS}"),
        ));
    }
    Ok(limit)
}

/// Zero-filled monthly series from sparse per-month totals.
pub fn monthly_series(
    months: &[NaiveDate],
    totals: &HashMap<NaiveDate, MonthTotals>,
) -> DomainResult<Vec<MonthSummary>> {
    months
        .iter()
        .map(|m| MonthSummary::new(*m, totals.get(m).copied().unwrap_or_default()))
        .collect()
}

/// Order top products by quantity (then revenue) and keep `limit`.
pub fn rank_top_products(mut rows: Vec<TopProduct>, limit: u32) -> Vec<TopProduct> {
    rows.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit as usize);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn chart_months_cross_year_boundaries() {
        let months = chart_months(d(2024, 2, 29), 4);
        assert_eq!(months, vec![d(2023, 11, 1), d(2023, 12, 1), d(2024, 1, 1), d(2024, 2, 1)]);
    }

    #[test]
    fn series_is_zero_filled() {
        let months = chart_months(d(2024, 3, 10), 3);
        let mut totals = HashMap::new();
        totals.insert(
            d(2024, 2, 1),
            MonthTotals {
                purchases: Money::from_minor(500),
                sales: Money::from_minor(900),
                expenses: Money::from_minor(100),
            },
        );
        let series = monthly_series(&months, &totals).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].month, "2024-01");
        assert_eq!(series[0].sales, Money::ZERO);
        assert_eq!(series[1].gross_profit, Money::from_minor(300));
    }

    #[test]
    fn gross_profit_may_be_negative() {
        let t = MonthTotals {
            purchases: Money::from_minor(1000),
            sales: Money::from_minor(200),
            expenses: Money::ZERO,
        };
        assert_eq!(t.gross_profit().unwrap(), Money::from_minor(-800));
    }

    #[test]
    fn limits_are_bounded() {
        assert_eq!(validate_months(None).unwrap(), 12);
        assert!(validate_months(Some(0)).is_err());
        assert!(validate_months(Some(25)).is_err());
        assert_eq!(validate_top_limit(None).unwrap(), 5);
        assert!(validate_top_limit(Some(51)).is_err());
    }

    #[test]
    fn top_products_rank_by_quantity() {
        let row = |name: &str, quantity| TopProduct {
            product_id: ProductId::new(),
            code: name.into(),
            name: name.into(),
            quantity,
            revenue: Money::ZERO,
        };
        let ranked = rank_top_products(vec![row("a", 1), row("b", 9), row("c", 5)], 2);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
