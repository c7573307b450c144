use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, require_text};
use stockroom_core::{
    DomainError, DomainResult, EmployeeId, Entity, Money, OrderId, ProductId, SortDirection,
    SortField, StockOutId,
};

use crate::stock_out::{NewStockOut, NewStockOutItem, price_lines};

/// Order status lifecycle.
///
/// `pending` is the only state that can change; fulfilled and cancelled
/// orders are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::validation(
                "status",
                "must be one of: pending, fulfilled, cancelled",
            )),
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub stock_out_id: Option<StockOutId>,
    pub note: Option<String>,
    pub created_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Order {
    pub fn create(
        input: NewOrder,
        price_of: impl Fn(ProductId) -> Option<Money>,
        created_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let requested: Vec<NewStockOutItem> = input
            .items
            .iter()
            .map(|i| NewStockOutItem {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();
        let items: Vec<OrderItem> = price_lines(&requested, price_of)?
            .into_iter()
            .map(|l| OrderItem {
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_total: l.line_total,
            })
            .collect();

        Ok(Self {
            id: OrderId::new(),
            customer_name: require_text("customer_name", &input.customer_name)?,
            customer_phone: optional_text(input.customer_phone),
            total: Money::sum(items.iter().map(|i| i.line_total))?,
            items,
            status: OrderStatus::Pending,
            stock_out_id: None,
            note: optional_text(input.note),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invariant(format!(
                "cannot {action} an order that is {}",
                self.status
            )));
        }
        Ok(())
    }

    /// Stock out input carrying this order's lines at their agreed prices.
    pub fn to_stock_out(&self, issued_on: NaiveDate) -> DomainResult<NewStockOut> {
        self.ensure_pending("fulfill")?;
        Ok(NewStockOut {
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            issued_on: Some(issued_on),
            items: self
                .items
                .iter()
                .map(|i| NewStockOutItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: Some(i.unit_price.minor()),
                })
                .collect(),
            discount: 0,
            note: Some(format!("Order {}", self.id)),
        })
    }

    pub fn fulfill(&mut self, stock_out_id: StockOutId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("fulfill")?;
        self.status = OrderStatus::Fulfilled;
        self.stock_out_id = Some(stock_out_id);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn search_fields(&self) -> [&str; 2] {
        [
            self.customer_name.as_str(),
            self.customer_phone.as_deref().unwrap_or(""),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| s == order.status)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum OrderSort {
    #[default]
    CreatedAt,
    Total,
    Customer,
}

impl SortField for OrderSort {
    const NAMES: &'static [&'static str] = &["created_at", "total", "customer_name"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(OrderSort::CreatedAt),
            "total" => Some(OrderSort::Total),
            "customer_name" => Some(OrderSort::Customer),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            OrderSort::CreatedAt => "created_at",
            OrderSort::Total => "total",
            OrderSort::Customer => "customer_name",
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            OrderSort::Customer => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

impl OrderSort {
    pub fn compare(self, a: &Order, b: &Order) -> core::cmp::Ordering {
        match self {
            OrderSort::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderSort::Total => a.total.cmp(&b.total),
            OrderSort::Customer => a
                .customer_name
                .to_lowercase()
                .cmp(&b.customer_name.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::create(
            NewOrder {
                customer_name: "Grace".into(),
                customer_phone: Some("555-0100".into()),
                items: vec![NewOrderItem {
                    product_id: ProductId::new(),
                    quantity: 4,
                    unit_price: None,
                }],
                note: None,
            },
            |_| Some(Money::from_minor(250)),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_orders_are_pending_and_priced() {
        let o = order();
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.total, Money::from_minor(1000));
    }

    #[test]
    fn stock_out_keeps_agreed_prices() {
        let o = order();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let input = o.to_stock_out(day).unwrap();
        assert_eq!(input.items[0].unit_price, Some(250));
        assert_eq!(input.issued_on, Some(day));
        assert_eq!(input.customer_name, "Grace");
    }

    #[test]
    fn only_pending_orders_transition() {
        let mut o = order();
        o.fulfill(StockOutId::new(), Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Fulfilled);
        assert!(o.stock_out_id.is_some());

        let err = o.cancel(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let mut o = order();
        o.cancel(Utc::now()).unwrap();
        assert!(o.fulfill(StockOutId::new(), Utc::now()).is_err());
        assert!(o.to_stock_out(Utc::now().date_naive()).is_err());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(OrderStatus::parse("Pending").unwrap(), OrderStatus::Pending);
        assert!(OrderStatus::parse("shipped").is_err());
    }
}
