use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use stockroom_core::{ListQuery, Page, ProductId, SupplierId};
use stockroom_parties::{Supplier, SupplierSort, UpdateSupplier};
use stockroom_products::{Product, ProductFilter, ProductSort, UpdateProduct};

use super::rows::Db;
use super::{PgStore, abort, count, map_sqlx_error, push_page, push_search};
use crate::error::{StoreError, StoreResult};
use crate::store::{ProductRepository, SupplierRepository};

fn push_product_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    query: &ListQuery<ProductSort>,
    filter: &ProductFilter,
) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND lower(category) = lower(");
        qb.push_bind(category.clone());
        qb.push(")");
    }
    push_search(qb, query, &["name", "code", "category"]);
}

async fn save_product<'e, E>(executor: E, p: &Product, operation: &str) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO products
            (id, code, name, category, unit, cost_price, sale_price, stock, reorder_level,
             image, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            code = EXCLUDED.code,
            name = EXCLUDED.name,
            category = EXCLUDED.category,
            unit = EXCLUDED.unit,
            cost_price = EXCLUDED.cost_price,
            sale_price = EXCLUDED.sale_price,
            reorder_level = EXCLUDED.reorder_level,
            image = EXCLUDED.image,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(*p.id.as_uuid())
    .bind(&p.code)
    .bind(&p.name)
    .bind(&p.category)
    .bind(&p.unit)
    .bind(p.cost_price.minor())
    .bind(p.sale_price.minor())
    .bind(p.stock)
    .bind(p.reorder_level)
    .bind(&p.image)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(())
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn create_product(&self, product: Product) -> StoreResult<Product> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(*product.id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;
        if exists {
            return Err(StoreError::conflict("product already exists"));
        }
        save_product(&self.pool, &product, "create_product").await?;
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        sqlx::query_as::<_, Db<Product>>("SELECT * FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .map(Db::into_inner)
            .ok_or_else(|| StoreError::not_found("product"))
    }

    async fn list_products(
        &self,
        query: &ListQuery<ProductSort>,
        filter: &ProductFilter,
    ) -> StoreResult<Page<Product>> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut counter, query, filter);
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let mut select = QueryBuilder::new("SELECT * FROM products");
        push_product_filters(&mut select, query, filter);
        push_page(&mut select, query);
        let items = select
            .build_query_as::<Db<Product>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?
            .into_iter()
            .map(Db::into_inner)
            .collect();

        Ok(Page::new(items, count(total), query))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let mut tx = self.begin().await?;
        let current = sqlx::query_as::<_, Db<Product>>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        let Some(Db(mut product)) = current else {
            return abort(tx, StoreError::not_found("product")).await;
        };
        if let Err(e) = product.apply_update(update, now) {
            return abort(tx, e.into()).await;
        }
        save_product(&mut *tx, &product, "update_product").await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(product)
    }

    async fn set_product_image(
        &self,
        id: ProductId,
        image: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Product, Option<String>)> {
        let mut tx = self.begin().await?;
        let previous: Option<Option<String>> =
            sqlx::query_scalar("SELECT image FROM products WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("set_product_image", e))?;
        let Some(previous) = previous else {
            return abort(tx, StoreError::not_found("product")).await;
        };
        let Db(product) = sqlx::query_as::<_, Db<Product>>(
            "UPDATE products SET image = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&image)
        .bind(now)
        .bind(*id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("set_product_image", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok((product, previous))
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<Product> {
        sqlx::query_as::<_, Db<Product>>("DELETE FROM products WHERE id = $1 RETURNING *")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_product", e) {
                StoreError::Conflict(_) => StoreError::conflict(
                    "product is used by goods receives, stock outs or orders",
                ),
                other => other,
            })?
            .map(Db::into_inner)
            .ok_or_else(|| StoreError::not_found("product"))
    }
}

async fn save_supplier<'e, E>(executor: E, s: &Supplier, operation: &str) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO suppliers (id, name, contact_person, phone, email, address, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            contact_person = EXCLUDED.contact_person,
            phone = EXCLUDED.phone,
            email = EXCLUDED.email,
            address = EXCLUDED.address
        "#,
    )
    .bind(*s.id.as_uuid())
    .bind(&s.name)
    .bind(&s.contact_person)
    .bind(&s.phone)
    .bind(&s.email)
    .bind(&s.address)
    .bind(s.created_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(())
}

#[async_trait]
impl SupplierRepository for PgStore {
    async fn create_supplier(&self, supplier: Supplier) -> StoreResult<Supplier> {
        save_supplier(&self.pool, &supplier, "create_supplier").await?;
        Ok(supplier)
    }

    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Supplier> {
        sqlx::query_as::<_, Db<Supplier>>("SELECT * FROM suppliers WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_supplier", e))?
            .map(Db::into_inner)
            .ok_or_else(|| StoreError::not_found("supplier"))
    }

    async fn list_suppliers(&self, query: &ListQuery<SupplierSort>) -> StoreResult<Page<Supplier>> {
        const SEARCH: &[&str] = &["name", "contact_person", "phone", "email"];

        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM suppliers WHERE TRUE");
        push_search(&mut counter, query, SEARCH);
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_suppliers", e))?;

        let mut select = QueryBuilder::new("SELECT * FROM suppliers WHERE TRUE");
        push_search(&mut select, query, SEARCH);
        push_page(&mut select, query);
        let items = select
            .build_query_as::<Db<Supplier>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_suppliers", e))?
            .into_iter()
            .map(Db::into_inner)
            .collect();

        Ok(Page::new(items, count(total), query))
    }

    async fn update_supplier(&self, id: SupplierId, update: UpdateSupplier) -> StoreResult<Supplier> {
        let mut tx = self.begin().await?;
        let current =
            sqlx::query_as::<_, Db<Supplier>>("SELECT * FROM suppliers WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_supplier", e))?;
        let Some(Db(mut supplier)) = current else {
            return abort(tx, StoreError::not_found("supplier")).await;
        };
        if let Err(e) = supplier.apply_update(update) {
            return abort(tx, e.into()).await;
        }
        save_supplier(&mut *tx, &supplier, "update_supplier").await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(supplier)
    }

    async fn delete_supplier(&self, id: SupplierId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_supplier", e) {
                StoreError::Conflict(_) => StoreError::conflict("supplier has goods receives"),
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("supplier"));
        }
        Ok(())
    }
}
