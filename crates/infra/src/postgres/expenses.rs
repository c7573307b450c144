use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use stockroom_accounting::{
    CategoryTotal, Expense, ExpenseFilter, ExpenseSort, ExpenseSummary, UpdateExpense,
};
use stockroom_core::{ExpenseId, ListQuery, Money, Page};

use super::rows::Db;
use super::{PgStore, abort, count, map_sqlx_error, push_page, push_search};
use crate::error::{StoreError, StoreResult};
use crate::store::ExpenseRepository;

fn push_expense_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ExpenseFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND lower(category) = lower(");
        qb.push_bind(category.clone());
        qb.push(")");
    }
    if let Some(from) = filter.range.from {
        qb.push(" AND spent_on >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.range.to {
        qb.push(" AND spent_on <= ");
        qb.push_bind(to);
    }
}

#[async_trait]
impl ExpenseRepository for PgStore {
    async fn create_expense(&self, expense: Expense) -> StoreResult<Expense> {
        sqlx::query(
            r#"
            INSERT INTO expenses (id, category, amount, spent_on, note, recorded_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*expense.id.as_uuid())
        .bind(&expense.category)
        .bind(expense.amount.minor())
        .bind(expense.spent_on)
        .bind(&expense.note)
        .bind(expense.recorded_by.map(Uuid::from))
        .bind(expense.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_expense", e))?;
        Ok(expense)
    }

    async fn get_expense(&self, id: ExpenseId) -> StoreResult<Expense> {
        sqlx::query_as::<_, Db<Expense>>("SELECT * FROM expenses WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_expense", e))?
            .map(Db::into_inner)
            .ok_or_else(|| StoreError::not_found("expense"))
    }

    async fn list_expenses(
        &self,
        query: &ListQuery<ExpenseSort>,
        filter: &ExpenseFilter,
    ) -> StoreResult<Page<Expense>> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM expenses");
        push_expense_filters(&mut counter, filter);
        push_search(&mut counter, query, &["category", "note"]);
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_expenses", e))?;

        let mut select = QueryBuilder::new("SELECT * FROM expenses");
        push_expense_filters(&mut select, filter);
        push_search(&mut select, query, &["category", "note"]);
        push_page(&mut select, query);
        let items = select
            .build_query_as::<Db<Expense>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_expenses", e))?
            .into_iter()
            .map(Db::into_inner)
            .collect();

        Ok(Page::new(items, count(total), query))
    }

    async fn update_expense(&self, id: ExpenseId, update: UpdateExpense) -> StoreResult<Expense> {
        let mut tx = self.begin().await?;
        let current =
            sqlx::query_as::<_, Db<Expense>>("SELECT * FROM expenses WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_expense", e))?;
        let Some(Db(mut expense)) = current else {
            return abort(tx, StoreError::not_found("expense")).await;
        };
        if let Err(e) = expense.apply_update(update) {
            return abort(tx, e.into()).await;
        }
        sqlx::query(
            "UPDATE expenses SET category = $1, amount = $2, spent_on = $3, note = $4 WHERE id = $5",
        )
        .bind(&expense.category)
        .bind(expense.amount.minor())
        .bind(expense.spent_on)
        .bind(&expense.note)
        .bind(*id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_expense", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(expense)
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_expense", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("expense"));
        }
        Ok(())
    }

    async fn expense_summary(&self, filter: &ExpenseFilter) -> StoreResult<ExpenseSummary> {
        let mut qb = QueryBuilder::new(
            "SELECT category, COALESCE(SUM(amount), 0)::BIGINT AS total, COUNT(*) AS n FROM expenses",
        );
        push_expense_filters(&mut qb, filter);
        qb.push(" GROUP BY category");
        let rows: Vec<(String, i64, i64)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("expense_summary", e))?;

        let categories = rows
            .into_iter()
            .map(|(category, total, n)| CategoryTotal {
                category,
                total: Money::from_minor(total),
                count: count(n),
            })
            .collect();
        Ok(ExpenseSummary::from_totals(filter.range, categories)?)
    }
}
