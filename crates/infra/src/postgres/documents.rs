//! Goods receives, stock outs and orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder, Transaction};
use tracing::{instrument, warn};
use uuid::Uuid;

use stockroom_core::{
    DocumentKind, EmployeeId, GoodsReceiveId, ListQuery, Money, OrderId, Page, ProductId,
    StockOutId, SortField,
};
use stockroom_inventory::{plan_issue, plan_receipt};
use stockroom_purchasing::{GoodsReceive, GoodsReceiveFilter, GoodsReceiveSort, NewGoodsReceive};
use stockroom_sales::{
    NewOrder, NewStockOut, Order, OrderFilter, OrderSort, StockOut, StockOutFilter, StockOutSort,
};

use super::rows::{Db, LineRow, attach_lines};
use super::{
    PgStore, apply_stock_changes, count, finish, lock_products, map_sqlx_error, next_sequence,
    push_page, push_search,
};
use crate::error::{StoreError, StoreResult};
use crate::store::{GoodsReceiveRepository, OrderRepository, StockOutRepository};

/// Line table layout for one document kind.
struct LineTable {
    table: &'static str,
    parent: &'static str,
    amount: &'static str,
}

const GOODS_RECEIVE_LINES: LineTable = LineTable {
    table: "goods_receive_items",
    parent: "goods_receive_id",
    amount: "unit_cost",
};
const STOCK_OUT_LINES: LineTable = LineTable {
    table: "stock_out_items",
    parent: "stock_out_id",
    amount: "unit_price",
};
const ORDER_LINES: LineTable = LineTable {
    table: "order_items",
    parent: "order_id",
    amount: "unit_price",
};

impl LineTable {
    async fn fetch(&self, conn: &mut PgConnection, parents: &[Uuid]) -> StoreResult<Vec<LineRow>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {parent} AS parent_id, product_id, quantity, {amount} AS amount, line_total \
             FROM {table} WHERE {parent} = ANY($1) ORDER BY {parent}, line_no",
            parent = self.parent,
            amount = self.amount,
            table = self.table,
        );
        sqlx::query_as::<_, LineRow>(&sql)
            .bind(parents)
            .fetch_all(conn)
            .await
            .map_err(|e| map_sqlx_error("fetch_lines", e))
    }

    async fn insert(
        &self,
        conn: &mut PgConnection,
        parent: Uuid,
        lines: impl IntoIterator<Item = (ProductId, i64, Money, Money)>,
    ) -> StoreResult<()> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}, line_no, product_id, quantity, {}, line_total) ",
            self.table, self.parent, self.amount
        ));
        qb.push_values(
            lines.into_iter().zip(1_i32..),
            |mut b, ((product_id, quantity, amount, line_total), line_no)| {
                b.push_bind(parent)
                    .push_bind(line_no)
                    .push_bind(Uuid::from(product_id))
                    .push_bind(quantity)
                    .push_bind(amount.minor())
                    .push_bind(line_total.minor());
            },
        );
        qb.build()
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("insert_lines", e))?;
        Ok(())
    }
}

/// Run a filtered COUNT and a paged SELECT over one document table.
async fn list_page<T, S>(
    store: &PgStore,
    table: &str,
    query: &ListQuery<S>,
    push_filters: impl Fn(&mut QueryBuilder<'_, Postgres>),
) -> StoreResult<(Vec<T>, u64)>
where
    S: SortField,
    for<'r> Db<T>: sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    T: Send + Unpin,
{
    let mut counter = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE TRUE"));
    push_filters(&mut counter);
    let total: i64 = counter
        .build_query_scalar()
        .fetch_one(&store.pool)
        .await
        .map_err(|e| map_sqlx_error("count_documents", e))?;

    let mut select = QueryBuilder::new(format!("SELECT * FROM {table} WHERE TRUE"));
    push_filters(&mut select);
    push_page(&mut select, query);
    let rows = select
        .build_query_as::<Db<T>>()
        .fetch_all(&store.pool)
        .await
        .map_err(|e| map_sqlx_error("list_documents", e))?
        .into_iter()
        .map(Db::into_inner)
        .collect();
    Ok((rows, count(total)))
}

fn push_range(
    qb: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    range: &stockroom_core::DateRange,
) {
    if let Some(from) = range.from {
        qb.push(format!(" AND {column} >= "));
        qb.push_bind(from);
    }
    if let Some(to) = range.to {
        qb.push(format!(" AND {column} <= "));
        qb.push_bind(to);
    }
}

async fn insert_stock_out(conn: &mut PgConnection, so: &StockOut) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_outs
            (id, reference, customer_name, customer_phone, issued_on, subtotal, discount, total,
             note, issued_by, order_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(*so.id.as_uuid())
    .bind(&so.reference)
    .bind(&so.customer_name)
    .bind(&so.customer_phone)
    .bind(so.issued_on)
    .bind(so.subtotal.minor())
    .bind(so.discount.minor())
    .bind(so.total.minor())
    .bind(&so.note)
    .bind(so.issued_by.map(Uuid::from))
    .bind(so.order_id.map(Uuid::from))
    .bind(so.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_stock_out", e))?;

    STOCK_OUT_LINES
        .insert(
            conn,
            *so.id.as_uuid(),
            so.items
                .iter()
                .map(|i| (i.product_id, i.quantity, i.unit_price, i.line_total)),
        )
        .await
}

/// Price, check and write a stock out inside `tx`, lowering stock.
async fn issue_stock_out(
    tx: &mut Transaction<'_, Postgres>,
    input: NewStockOut,
    issued_by: Option<EmployeeId>,
    order_id: Option<OrderId>,
    now: DateTime<Utc>,
) -> StoreResult<StockOut> {
    let date = input.document_date(now);
    let locked = lock_products(tx, input.items.iter().map(|i| i.product_id)).await?;
    let sequence = next_sequence(tx, DocumentKind::StockOut, date).await?;
    let stock_out = StockOut::create(
        input,
        |id| locked.sale_prices.get(&id).copied(),
        DocumentKind::StockOut.reference(date, sequence),
        issued_by,
        order_id,
        now,
    )?;
    let changes = plan_issue(&locked.levels, &stock_out.stock_lines()).inspect_err(|e| {
        warn!(error = %e, "stock out rejected");
    })?;
    apply_stock_changes(tx, &changes, now).await?;
    insert_stock_out(tx, &stock_out).await?;
    Ok(stock_out)
}

async fn fetch_goods_receive(
    conn: &mut PgConnection,
    id: GoodsReceiveId,
    lock: bool,
) -> StoreResult<GoodsReceive> {
    let sql = if lock {
        "SELECT * FROM goods_receives WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM goods_receives WHERE id = $1"
    };
    let Db(mut receive) = sqlx::query_as::<_, Db<GoodsReceive>>(sql)
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_goods_receive", e))?
        .ok_or_else(|| StoreError::not_found("goods receive"))?;
    receive.items = GOODS_RECEIVE_LINES
        .fetch(conn, &[*id.as_uuid()])
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(receive)
}

async fn fetch_stock_out(conn: &mut PgConnection, id: StockOutId, lock: bool) -> StoreResult<StockOut> {
    let sql = if lock {
        "SELECT * FROM stock_outs WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM stock_outs WHERE id = $1"
    };
    let Db(mut stock_out) = sqlx::query_as::<_, Db<StockOut>>(sql)
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_stock_out", e))?
        .ok_or_else(|| StoreError::not_found("stock out"))?;
    stock_out.items = STOCK_OUT_LINES
        .fetch(conn, &[*id.as_uuid()])
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(stock_out)
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId, lock: bool) -> StoreResult<Order> {
    let sql = if lock {
        "SELECT * FROM orders WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM orders WHERE id = $1"
    };
    let Db(mut order) = sqlx::query_as::<_, Db<Order>>(sql)
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?
        .ok_or_else(|| StoreError::not_found("order"))?;
    order.items = ORDER_LINES
        .fetch(conn, &[*id.as_uuid()])
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(order)
}

#[async_trait]
impl GoodsReceiveRepository for PgStore {
    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, lines = input.items.len()), err)]
    async fn create_goods_receive(
        &self,
        input: NewGoodsReceive,
        received_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<GoodsReceive> {
        let mut tx = self.begin().await?;
        let result = async {
            let supplier: Option<Uuid> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = $1")
                .bind(*input.supplier_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_goods_receive", e))?;
            if supplier.is_none() {
                return Err(StoreError::not_found("supplier"));
            }

            let date = input.document_date(now);
            let locked = lock_products(&mut tx, input.items.iter().map(|i| i.product_id)).await?;
            let sequence = next_sequence(&mut tx, DocumentKind::GoodsReceive, date).await?;
            let receive = GoodsReceive::create(
                input,
                DocumentKind::GoodsReceive.reference(date, sequence),
                received_by,
                now,
            )?;
            let changes = plan_receipt(&locked.levels, &receive.stock_lines())?;
            apply_stock_changes(&mut tx, &changes, now).await?;
            for item in &receive.items {
                sqlx::query("UPDATE products SET cost_price = $1 WHERE id = $2")
                    .bind(item.unit_cost.minor())
                    .bind(Uuid::from(item.product_id))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_cost_price", e))?;
            }

            sqlx::query(
                r#"
                INSERT INTO goods_receives
                    (id, reference, supplier_id, received_on, subtotal, discount, total, paid,
                     due, note, received_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(*receive.id.as_uuid())
            .bind(&receive.reference)
            .bind(*receive.supplier_id.as_uuid())
            .bind(receive.received_on)
            .bind(receive.subtotal.minor())
            .bind(receive.discount.minor())
            .bind(receive.total.minor())
            .bind(receive.paid.minor())
            .bind(receive.due.minor())
            .bind(&receive.note)
            .bind(receive.received_by.map(Uuid::from))
            .bind(receive.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_goods_receive", e))?;

            GOODS_RECEIVE_LINES
                .insert(
                    &mut tx,
                    *receive.id.as_uuid(),
                    receive
                        .items
                        .iter()
                        .map(|i| (i.product_id, i.quantity, i.unit_cost, i.line_total)),
                )
                .await?;
            Ok::<_, StoreError>(receive)
        }
        .await;
        finish(tx, result).await
    }

    async fn get_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<GoodsReceive> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_goods_receive(&mut conn, id, false).await
    }

    async fn list_goods_receives(
        &self,
        query: &ListQuery<GoodsReceiveSort>,
        filter: &GoodsReceiveFilter,
    ) -> StoreResult<Page<GoodsReceive>> {
        let (mut items, total) = list_page::<GoodsReceive, _>(self, "goods_receives", query, |qb| {
            if let Some(supplier_id) = filter.supplier_id {
                qb.push(" AND supplier_id = ");
                qb.push_bind(Uuid::from(supplier_id));
            }
            push_range(qb, "received_on", &filter.range);
            push_search(qb, query, &["reference", "note"]);
        })
        .await?;

        let ids: Vec<Uuid> = items.iter().map(|g| *g.id.as_uuid()).collect();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let lines = GOODS_RECEIVE_LINES.fetch(&mut conn, &ids).await?;
        attach_lines(&mut items, lines, |g| *g.id.as_uuid(), |g| &mut g.items);
        Ok(Page::new(items, total, query))
    }

    #[instrument(skip(self), err)]
    async fn delete_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let result = async {
            let receive = fetch_goods_receive(&mut tx, id, true).await?;
            let locked = lock_products(&mut tx, receive.items.iter().map(|i| i.product_id)).await?;
            let changes = plan_issue(&locked.levels, &receive.stock_lines()).inspect_err(|e| {
                warn!(error = %e, "goods receive reversal rejected");
            })?;
            apply_stock_changes(&mut tx, &changes, Utc::now()).await?;
            sqlx::query("DELETE FROM goods_receives WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_goods_receive", e))?;
            Ok::<_, StoreError>(())
        }
        .await;
        finish(tx, result).await
    }
}

#[async_trait]
impl StockOutRepository for PgStore {
    #[instrument(skip(self, input), fields(lines = input.items.len()), err)]
    async fn create_stock_out(
        &self,
        input: NewStockOut,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<StockOut> {
        let mut tx = self.begin().await?;
        let result = issue_stock_out(&mut tx, input, issued_by, None, now).await;
        finish(tx, result).await
    }

    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOut> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_stock_out(&mut conn, id, false).await
    }

    async fn list_stock_outs(
        &self,
        query: &ListQuery<StockOutSort>,
        filter: &StockOutFilter,
    ) -> StoreResult<Page<StockOut>> {
        let (mut items, total) = list_page::<StockOut, _>(self, "stock_outs", query, |qb| {
            push_range(qb, "issued_on", &filter.range);
            push_search(qb, query, &["reference", "customer_name", "customer_phone"]);
        })
        .await?;

        let ids: Vec<Uuid> = items.iter().map(|s| *s.id.as_uuid()).collect();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let lines = STOCK_OUT_LINES.fetch(&mut conn, &ids).await?;
        attach_lines(&mut items, lines, |s| *s.id.as_uuid(), |s| &mut s.items);
        Ok(Page::new(items, total, query))
    }

    #[instrument(skip(self), err)]
    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let result = async {
            let stock_out = fetch_stock_out(&mut tx, id, true).await?;
            if let Some(order_id) = stock_out.order_id {
                return Err(StoreError::conflict(format!(
                    "stock out fulfils order {order_id}"
                )));
            }
            let locked =
                lock_products(&mut tx, stock_out.items.iter().map(|i| i.product_id)).await?;
            let changes = plan_receipt(&locked.levels, &stock_out.stock_lines())?;
            apply_stock_changes(&mut tx, &changes, Utc::now()).await?;
            sqlx::query("DELETE FROM stock_outs WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_stock_out", e))?;
            Ok::<_, StoreError>(())
        }
        .await;
        finish(tx, result).await
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn create_order(
        &self,
        input: NewOrder,
        created_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let mut tx = self.begin().await?;
        let result = async {
            let ids: Vec<Uuid> = input.items.iter().map(|i| Uuid::from(i.product_id)).collect();
            let prices: Vec<(Uuid, i64)> =
                sqlx::query_as("SELECT id, sale_price FROM products WHERE id = ANY($1)")
                    .bind(&ids)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("create_order", e))?;
            let prices: std::collections::HashMap<ProductId, Money> = prices
                .into_iter()
                .map(|(id, price)| (ProductId::from_uuid(id), Money::from_minor(price)))
                .collect();
            if input.items.iter().any(|i| !prices.contains_key(&i.product_id)) {
                return Err(StoreError::not_found("product"));
            }

            let order = Order::create(input, |id| prices.get(&id).copied(), created_by, now)?;
            sqlx::query(
                r#"
                INSERT INTO orders
                    (id, customer_name, customer_phone, total, status, stock_out_id, note,
                     created_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $8, $9)
                "#,
            )
            .bind(*order.id.as_uuid())
            .bind(&order.customer_name)
            .bind(&order.customer_phone)
            .bind(order.total.minor())
            .bind(order.status.as_str())
            .bind(&order.note)
            .bind(order.created_by.map(Uuid::from))
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;

            ORDER_LINES
                .insert(
                    &mut tx,
                    *order.id.as_uuid(),
                    order
                        .items
                        .iter()
                        .map(|i| (i.product_id, i.quantity, i.unit_price, i.line_total)),
                )
                .await?;
            Ok::<_, StoreError>(order)
        }
        .await;
        finish(tx, result).await
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Order> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        fetch_order(&mut conn, id, false).await
    }

    async fn list_orders(
        &self,
        query: &ListQuery<OrderSort>,
        filter: &OrderFilter,
    ) -> StoreResult<Page<Order>> {
        let (mut items, total) = list_page::<Order, _>(self, "orders", query, |qb| {
            if let Some(status) = filter.status {
                qb.push(" AND status = ");
                qb.push_bind(status.as_str());
            }
            push_search(qb, query, &["customer_name", "customer_phone"]);
        })
        .await?;

        let ids: Vec<Uuid> = items.iter().map(|o| *o.id.as_uuid()).collect();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let lines = ORDER_LINES.fetch(&mut conn, &ids).await?;
        attach_lines(&mut items, lines, |o| *o.id.as_uuid(), |o| &mut o.items);
        Ok(Page::new(items, total, query))
    }

    #[instrument(skip(self), err)]
    async fn fulfill_order(
        &self,
        id: OrderId,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Order, StockOut)> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut order = fetch_order(&mut tx, id, true).await?;
            let input = order.to_stock_out(now.date_naive())?;
            let stock_out = issue_stock_out(&mut tx, input, issued_by, Some(id), now).await?;
            order.fulfill(stock_out.id, now)?;
            sqlx::query(
                "UPDATE orders SET status = $1, stock_out_id = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(order.status.as_str())
            .bind(order.stock_out_id.map(Uuid::from))
            .bind(order.updated_at)
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("fulfill_order", e))?;
            Ok::<_, StoreError>((order, stock_out))
        }
        .await;
        finish(tx, result).await
    }

    async fn cancel_order(&self, id: OrderId, now: DateTime<Utc>) -> StoreResult<Order> {
        let mut tx = self.begin().await?;
        let result = async {
            let mut order = fetch_order(&mut tx, id, true).await?;
            order.cancel(now)?;
            sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
                .bind(order.status.as_str())
                .bind(order.updated_at)
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("cancel_order", e))?;
            Ok::<_, StoreError>(order)
        }
        .await;
        finish(tx, result).await
    }
}
