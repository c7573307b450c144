use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, require_text};
use stockroom_core::{
    DateRange, DomainError, DomainResult, EmployeeId, Entity, Money, OrderId, ProductId,
    SortDirection, SortField, StockOutId,
};
use stockroom_inventory::StockLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOutItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Stock out (sale) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOut {
    pub id: StockOutId,
    pub reference: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub issued_on: NaiveDate,
    pub items: Vec<StockOutItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub note: Option<String>,
    pub issued_by: Option<EmployeeId>,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for StockOut {
    type Id = StockOutId;

    fn id(&self) -> StockOutId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStockOutItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Falls back to the product's sale price.
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStockOut {
    #[serde(default = "walk_in")]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    pub items: Vec<NewStockOutItem>,
    #[serde(default)]
    pub discount: i64,
    #[serde(default)]
    pub note: Option<String>,
}

fn walk_in() -> String {
    "Walk-in customer".to_string()
}

impl NewStockOut {
    pub fn document_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.issued_on.unwrap_or_else(|| now.date_naive())
    }
}

/// Price each requested line, resolving missing unit prices with `price_of`.
///
/// Lines for the same product are kept separate here; stock planning
/// aggregates them.
pub(crate) fn price_lines(
    items: &[NewStockOutItem],
    price_of: impl Fn(ProductId) -> Option<Money>,
) -> DomainResult<Vec<StockOutItem>> {
    if items.is_empty() {
        return Err(DomainError::validation("items", "at least one item is required"));
    }
    items
        .iter()
        .map(|item| {
            if item.quantity <= 0 {
                return Err(DomainError::validation("quantity", "must be positive"));
            }
            let unit_price = match item.unit_price {
                Some(minor) => Money::non_negative("unit_price", minor)?,
                None => price_of(item.product_id).ok_or_else(|| DomainError::not_found("product"))?,
            };
            Ok(StockOutItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price,
                line_total: unit_price.times(item.quantity)?,
            })
        })
        .collect()
}

impl StockOut {
    pub fn create(
        input: NewStockOut,
        price_of: impl Fn(ProductId) -> Option<Money>,
        reference: String,
        issued_by: Option<EmployeeId>,
        order_id: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let items = price_lines(&input.items, price_of)?;
        let subtotal = Money::sum(items.iter().map(|i| i.line_total))?;
        let discount = Money::non_negative("discount", input.discount)?;
        if discount > subtotal {
            return Err(DomainError::validation("discount", "cannot exceed the subtotal"));
        }

        Ok(Self {
            id: StockOutId::new(),
            reference,
            customer_name: require_text("customer_name", &input.customer_name)?,
            customer_phone: optional_text(input.customer_phone.clone()),
            issued_on: input.document_date(now),
            items,
            subtotal,
            total: subtotal.checked_sub(discount)?,
            discount,
            note: optional_text(input.note),
            issued_by,
            order_id,
            created_at: now,
        })
    }

    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.items
            .iter()
            .map(|i| StockLine {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect()
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn search_fields(&self) -> [&str; 3] {
        [
            self.reference.as_str(),
            self.customer_name.as_str(),
            self.customer_phone.as_deref().unwrap_or(""),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockOutFilter {
    pub range: DateRange,
}

impl StockOutFilter {
    pub fn matches(&self, so: &StockOut) -> bool {
        self.range.contains(so.issued_on)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum StockOutSort {
    #[default]
    IssuedOn,
    Total,
    CreatedAt,
}

impl SortField for StockOutSort {
    const NAMES: &'static [&'static str] = &["issued_on", "total", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "issued_on" => Some(StockOutSort::IssuedOn),
            "total" => Some(StockOutSort::Total),
            "created_at" => Some(StockOutSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            StockOutSort::IssuedOn => "issued_on",
            StockOutSort::Total => "total",
            StockOutSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        SortDirection::Desc
    }
}

impl StockOutSort {
    pub fn compare(self, a: &StockOut, b: &StockOut) -> core::cmp::Ordering {
        match self {
            StockOutSort::IssuedOn => a
                .issued_on
                .cmp(&b.issued_on)
                .then_with(|| a.created_at.cmp(&b.created_at)),
            StockOutSort::Total => a.total.cmp(&b.total),
            StockOutSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_stock_out(items: Vec<NewStockOutItem>) -> NewStockOut {
        NewStockOut {
            customer_name: "Ada".into(),
            customer_phone: None,
            issued_on: None,
            items,
            discount: 0,
            note: None,
        }
    }

    #[test]
    fn missing_prices_fall_back_to_catalogue() {
        let p = ProductId::new();
        let input = new_stock_out(vec![
            NewStockOutItem { product_id: p, quantity: 2, unit_price: None },
            NewStockOutItem { product_id: p, quantity: 1, unit_price: Some(450) },
        ]);
        let so = StockOut::create(input, |_| Some(Money::from_minor(500)), "SO-1".into(), None, None, Utc::now())
            .unwrap();

        assert_eq!(so.items[0].unit_price, Money::from_minor(500));
        assert_eq!(so.subtotal, Money::from_minor(1450));
        assert_eq!(so.total, so.subtotal);
    }

    #[test]
    fn unknown_product_without_price_is_not_found() {
        let input = new_stock_out(vec![NewStockOutItem {
            product_id: ProductId::new(),
            quantity: 1,
            unit_price: None,
        }]);
        let err = StockOut::create(input, |_| None, "SO-1".into(), None, None, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::not_found("product"));
    }

    #[test]
    fn blank_customer_is_rejected() {
        let mut input = new_stock_out(vec![NewStockOutItem {
            product_id: ProductId::new(),
            quantity: 1,
            unit_price: Some(1),
        }]);
        input.customer_name = "  ".into();
        assert!(StockOut::create(input, |_| None, "SO-1".into(), None, None, Utc::now()).is_err());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let input = new_stock_out(vec![NewStockOutItem {
            product_id: ProductId::new(),
            quantity: -3,
            unit_price: Some(1),
        }]);
        let err = StockOut::create(input, |_| None, "SO-1".into(), None, None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "quantity", .. }));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: line totals add up to the subtotal and the total is
            /// what remains after the discount.
            #[test]
            fn total_is_subtotal_less_discount(
                lines in proptest::collection::vec((1i64..500, proptest::option::of(0i64..5_000)), 1..8),
                catalogue in 0i64..5_000,
                discount in 0i64..20_000,
            ) {
                let items = lines
                    .iter()
                    .map(|(quantity, unit_price)| NewStockOutItem {
                        product_id: ProductId::new(),
                        quantity: *quantity,
                        unit_price: *unit_price,
                    })
                    .collect();
                let mut input = new_stock_out(items);
                input.discount = discount;

                let created = StockOut::create(
                    input,
                    |_| Some(Money::from_minor(catalogue)),
                    "SO-1".into(),
                    None,
                    None,
                    Utc::now(),
                );
                let expected: i64 = lines
                    .iter()
                    .map(|(q, price)| q * price.unwrap_or(catalogue))
                    .sum();
                match created {
                    Ok(so) => {
                        prop_assert_eq!(so.subtotal, Money::from_minor(expected));
                        prop_assert_eq!(so.total, so.subtotal.checked_sub(so.discount).unwrap());
                        prop_assert!(so.discount <= so.subtotal);
                    }
                    Err(_) => prop_assert!(discount > expected),
                }
            }
        }
    }
}
