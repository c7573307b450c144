use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::optional_text;
use stockroom_core::{
    DateRange, DomainError, DomainResult, EmployeeId, Entity, GoodsReceiveId, Money, ProductId,
    SortDirection, SortField, SupplierId,
};
use stockroom_inventory::StockLine;

/// Goods receive line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiveItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
    pub line_total: Money,
}

/// Goods receive (purchase) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceive {
    pub id: GoodsReceiveId,
    pub reference: String,
    pub supplier_id: SupplierId,
    pub received_on: NaiveDate,
    pub items: Vec<GoodsReceiveItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub due: Money,
    pub note: Option<String>,
    pub received_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for GoodsReceive {
    type Id = GoodsReceiveId;

    fn id(&self) -> GoodsReceiveId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGoodsReceiveItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGoodsReceive {
    pub supplier_id: SupplierId,
    /// Defaults to the creation date.
    #[serde(default)]
    pub received_on: Option<NaiveDate>,
    pub items: Vec<NewGoodsReceiveItem>,
    #[serde(default)]
    pub discount: i64,
    #[serde(default)]
    pub paid: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewGoodsReceive {
    pub fn document_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.received_on.unwrap_or_else(|| now.date_naive())
    }
}

impl GoodsReceive {
    /// Validate input and compute totals. `reference` is allocated by storage.
    pub fn create(
        input: NewGoodsReceive,
        reference: String,
        received_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.items.is_empty() {
            return Err(DomainError::validation("items", "at least one item is required"));
        }

        let mut items: Vec<GoodsReceiveItem> = Vec::with_capacity(input.items.len());
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("quantity", "must be positive"));
            }
            if items.iter().any(|i| i.product_id == item.product_id) {
                return Err(DomainError::validation(
                    "items",
                    format!("product {} appears more than once", item.product_id),
                ));
            }
            let unit_cost = Money::non_negative("unit_cost", item.unit_cost)?;
            items.push(GoodsReceiveItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_cost,
                line_total: unit_cost.times(item.quantity)?,
            });
        }

        let subtotal = Money::sum(items.iter().map(|i| i.line_total))?;
        let discount = Money::non_negative("discount", input.discount)?;
        if discount > subtotal {
            return Err(DomainError::validation("discount", "cannot exceed the subtotal"));
        }
        let total = subtotal.checked_sub(discount)?;

        let paid = Money::non_negative("paid", input.paid)?;
        if paid > total {
            return Err(DomainError::validation("paid", "cannot exceed the total"));
        }

        Ok(Self {
            id: GoodsReceiveId::new(),
            reference,
            supplier_id: input.supplier_id,
            received_on: input.document_date(now),
            items,
            subtotal,
            discount,
            total,
            paid,
            due: total.checked_sub(paid)?,
            note: optional_text(input.note),
            received_by,
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

    pub fn search_fields(&self) -> [&str; 2] {
        [self.reference.as_str(), self.note.as_deref().unwrap_or("")]
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }
}

/// List filters beyond search/sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoodsReceiveFilter {
    pub supplier_id: Option<SupplierId>,
    pub range: DateRange,
}

impl GoodsReceiveFilter {
    pub fn matches(&self, gr: &GoodsReceive) -> bool {
        self.supplier_id.is_none_or(|s| s == gr.supplier_id) && self.range.contains(gr.received_on)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum GoodsReceiveSort {
    #[default]
    ReceivedOn,
    Total,
    CreatedAt,
}

impl SortField for GoodsReceiveSort {
    const NAMES: &'static [&'static str] = &["received_on", "total", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "received_on" => Some(GoodsReceiveSort::ReceivedOn),
            "total" => Some(GoodsReceiveSort::Total),
            "created_at" => Some(GoodsReceiveSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            GoodsReceiveSort::ReceivedOn => "received_on",
            GoodsReceiveSort::Total => "total",
            GoodsReceiveSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        SortDirection::Desc
    }
}

impl GoodsReceiveSort {
    pub fn compare(self, a: &GoodsReceive, b: &GoodsReceive) -> core::cmp::Ordering {
        match self {
            GoodsReceiveSort::ReceivedOn => a
                .received_on
                .cmp(&b.received_on)
                .then_with(|| a.created_at.cmp(&b.created_at)),
            GoodsReceiveSort::Total => a.total.cmp(&b.total),
            GoodsReceiveSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}
