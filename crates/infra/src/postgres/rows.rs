//! Row decoding for the Postgres backend.
//!
//! Document headers decode with empty `items`; lines are fetched in a second
//! query and attached with [`attach_lines`].

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use stockroom_accounting::Expense;
use stockroom_auth::{Employee, EmployeeStatus, Role};
use stockroom_core::{
    EmployeeId, ExpenseId, GoodsReceiveId, Money, OrderId, ProductId, StockOutId, SupplierId,
};
use stockroom_parties::Supplier;
use stockroom_products::Product;
use stockroom_purchasing::{GoodsReceive, GoodsReceiveItem};
use stockroom_sales::{Order, OrderItem, OrderStatus, StockOut, StockOutItem};

/// Local wrapper so domain types can be decoded without sqlx in the domain crates.
pub(crate) struct Db<T>(pub T);

impl<T> Db<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn money(row: &PgRow, column: &str) -> Result<Money, sqlx::Error> {
    Ok(Money::from_minor(row.try_get(column)?))
}

fn decode<T, E>(column: &str, parsed: Result<T, E>) -> Result<T, sqlx::Error>
where
    E: std::error::Error + Send + Sync + 'static,
{
    parsed.map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn opt_id<T: From<Uuid>>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error> {
    Ok(row.try_get::<Option<Uuid>, _>(column)?.map(T::from))
}

impl<'r> FromRow<'r, PgRow> for Db<Product> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            unit: row.try_get("unit")?,
            cost_price: money(row, "cost_price")?,
            sale_price: money(row, "sale_price")?,
            stock: row.try_get("stock")?,
            reorder_level: row.try_get("reorder_level")?,
            image: row.try_get("image")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<Supplier> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(Supplier {
            id: SupplierId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            contact_person: row.try_get("contact_person")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<Employee> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let status: String = row.try_get("status")?;
        Ok(Db(Employee {
            id: EmployeeId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            role: decode("role", Role::parse(&role))?,
            status: decode("status", EmployeeStatus::parse(&status))?,
            password_hash: row.try_get("password_hash")?,
            joined_on: row.try_get("joined_on")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<Expense> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(Expense {
            id: ExpenseId::from_uuid(row.try_get("id")?),
            category: row.try_get("category")?,
            amount: money(row, "amount")?,
            spent_on: row.try_get("spent_on")?,
            note: row.try_get("note")?,
            recorded_by: opt_id(row, "recorded_by")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<GoodsReceive> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(GoodsReceive {
            id: GoodsReceiveId::from_uuid(row.try_get("id")?),
            reference: row.try_get("reference")?,
            supplier_id: SupplierId::from_uuid(row.try_get("supplier_id")?),
            received_on: row.try_get("received_on")?,
            items: Vec::new(),
            subtotal: money(row, "subtotal")?,
            discount: money(row, "discount")?,
            total: money(row, "total")?,
            paid: money(row, "paid")?,
            due: money(row, "due")?,
            note: row.try_get("note")?,
            received_by: opt_id(row, "received_by")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<StockOut> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Db(StockOut {
            id: StockOutId::from_uuid(row.try_get("id")?),
            reference: row.try_get("reference")?,
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            issued_on: row.try_get("issued_on")?,
            items: Vec::new(),
            subtotal: money(row, "subtotal")?,
            discount: money(row, "discount")?,
            total: money(row, "total")?,
            note: row.try_get("note")?,
            issued_by: opt_id(row, "issued_by")?,
            order_id: opt_id(row, "order_id")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> FromRow<'r, PgRow> for Db<Order> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Db(Order {
            id: OrderId::from_uuid(row.try_get("id")?),
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            items: Vec::new(),
            total: money(row, "total")?,
            status: decode("status", OrderStatus::parse(&status))?,
            stock_out_id: opt_id(row, "stock_out_id")?,
            note: row.try_get("note")?,
            created_by: opt_id(row, "created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

/// One document line, selected as `parent_id, product_id, quantity, amount, line_total`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineRow {
    pub parent_id: Uuid,
    pub product_id: ProductId,
    pub quantity: i64,
    pub amount: Money,
    pub line_total: Money,
}

impl<'r> FromRow<'r, PgRow> for LineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineRow {
            parent_id: row.try_get("parent_id")?,
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            amount: money(row, "amount")?,
            line_total: money(row, "line_total")?,
        })
    }
}

impl From<LineRow> for GoodsReceiveItem {
    fn from(line: LineRow) -> Self {
        GoodsReceiveItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_cost: line.amount,
            line_total: line.line_total,
        }
    }
}

impl From<LineRow> for StockOutItem {
    fn from(line: LineRow) -> Self {
        StockOutItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.amount,
            line_total: line.line_total,
        }
    }
}

impl From<LineRow> for OrderItem {
    fn from(line: LineRow) -> Self {
        OrderItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.amount,
            line_total: line.line_total,
        }
    }
}

/// Distribute lines (already in `line_no` order) over their documents.
pub(crate) fn attach_lines<D, I>(
    docs: &mut [D],
    lines: Vec<LineRow>,
    key: impl Fn(&D) -> Uuid,
    items: impl Fn(&mut D) -> &mut Vec<I>,
) where
    I: From<LineRow>,
{
    let mut by_parent: HashMap<Uuid, Vec<I>> = HashMap::new();
    for line in lines {
        by_parent.entry(line.parent_id).or_default().push(I::from(line));
    }
    for doc in docs.iter_mut() {
        if let Some(found) = by_parent.remove(&key(doc)) {
            *items(doc) = found;
        }
    }
}
