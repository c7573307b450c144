//! Postgres-backed store.
//!
//! ## Error mapping
//!
//! | PostgreSQL code | StoreError | Scenario |
//! |---|---|---|
//! | `23505` | `Conflict` | duplicate product code, employee e-mail, reference |
//! | `23503` | `Conflict` | deleting a row still referenced by a document |
//! | `23514` | `Domain` | check constraint (e.g. stock would go negative) |
//! | other | `Database` | connectivity, pool closed, decoding |
//!
//! ## Stock moves
//!
//! Goods receive, stock out, order fulfilment and their deletions run in one
//! transaction each. The touched product rows are read with
//! `SELECT ... FOR UPDATE` (in id order, so concurrent documents cannot
//! deadlock), planned with the pure planners from `stockroom-inventory`, and
//! the transaction is rolled back explicitly when planning fails.

mod catalog;
mod documents;
mod employees;
mod expenses;
mod reports;
mod rows;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use stockroom_core::{DocumentKind, DomainError, ListQuery, Money, ProductId, SortField};
use stockroom_inventory::StockChange;

use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and make sure the schema exists.
    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the idempotent schema script.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message().to_string();
        match db_err.code().as_deref() {
            Some("23505") => {
                return StoreError::Conflict(match db_err.constraint() {
                    Some("products_code_key") => "product code is already in use".to_string(),
                    Some("employees_email_key") => "e-mail is already registered".to_string(),
                    _ => format!("{operation}: {msg}"),
                });
            }
            Some("23503") => {
                return StoreError::Conflict(format!("{operation}: row is still referenced"));
            }
            Some("23514") => {
                return StoreError::Domain(DomainError::invariant(format!("{operation}: {msg}")));
            }
            _ => {}
        }
    }
    tracing::error!(operation, error = %err, "database error");
    StoreError::Database(err)
}

/// Roll back and return `err`.
pub(crate) async fn abort<T>(tx: Transaction<'_, Postgres>, err: StoreError) -> StoreResult<T> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err)
}

/// Commit on success, roll back on failure.
pub(crate) async fn finish<T>(tx: Transaction<'_, Postgres>, result: StoreResult<T>) -> StoreResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("commit_transaction", e))?;
            Ok(value)
        }
        Err(err) => abort(tx, err).await,
    }
}

pub(crate) fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Products touched by a document, locked for the rest of the transaction.
pub(crate) struct LockedProducts {
    pub levels: HashMap<ProductId, i64>,
    pub sale_prices: HashMap<ProductId, Money>,
}

pub(crate) async fn lock_products(
    tx: &mut Transaction<'_, Postgres>,
    ids: impl IntoIterator<Item = ProductId>,
) -> StoreResult<LockedProducts> {
    let mut ids: Vec<Uuid> = ids.into_iter().map(Uuid::from).collect();
    ids.sort();
    ids.dedup();

    let rows = sqlx::query(
        "SELECT id, stock, sale_price FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_products", e))?;

    let mut locked = LockedProducts {
        levels: HashMap::with_capacity(rows.len()),
        sale_prices: HashMap::with_capacity(rows.len()),
    };
    for row in rows {
        let id = ProductId::from_uuid(row.try_get("id")?);
        locked.levels.insert(id, row.try_get("stock")?);
        locked
            .sale_prices
            .insert(id, Money::from_minor(row.try_get("sale_price")?));
    }
    Ok(locked)
}

pub(crate) async fn apply_stock_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: &[StockChange],
    now: DateTime<Utc>,
) -> StoreResult<()> {
    for change in changes {
        sqlx::query("UPDATE products SET stock = $1, updated_at = $2 WHERE id = $3")
            .bind(change.after)
            .bind(now)
            .bind(Uuid::from(change.product_id))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("apply_stock_change", e))?;
    }
    Ok(())
}

/// Allocate the next daily sequence number; rolled back with the transaction.
pub(crate) async fn next_sequence(
    tx: &mut Transaction<'_, Postgres>,
    kind: DocumentKind,
    day: NaiveDate,
) -> StoreResult<u32> {
    let seq: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (kind, day, last_seq)
        VALUES ($1, $2, 1)
        ON CONFLICT (kind, day) DO UPDATE SET last_seq = document_sequences.last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(kind.prefix())
    .bind(day)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("next_sequence", e))?;
    u32::try_from(seq).map_err(|_| StoreError::Unavailable("sequence out of range".to_string()))
}

/// ` AND (a ILIKE $n OR b ILIKE $n ...)` when a search term is present.
pub(crate) fn push_search<S: SortField>(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery<S>,
    columns: &[&str],
) {
    let Some(pattern) = query.like_pattern() else {
        return;
    };
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(format!("COALESCE({column}, '') ILIKE "));
        qb.push_bind(pattern.clone());
    }
    qb.push(")");
}

/// ` ORDER BY <column> <dir>, id LIMIT .. OFFSET ..`
pub(crate) fn push_page<S: SortField>(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery<S>) {
    qb.push(format!(
        " ORDER BY {} {}, id {} LIMIT ",
        query.sort.column(),
        query.direction.as_sql(),
        query.direction.as_sql()
    ));
    qb.push_bind(query.limit());
    qb.push(" OFFSET ");
    qb.push_bind(query.offset());
}
