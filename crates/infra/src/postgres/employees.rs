use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use stockroom_auth::{Employee, EmployeeFilter, EmployeeSort, UpdateEmployee};
use stockroom_core::{EmployeeId, ListQuery, Page};

use super::rows::Db;
use super::{PgStore, abort, count, map_sqlx_error, push_page, push_search};
use crate::error::{StoreError, StoreResult};
use crate::store::EmployeeRepository;

fn push_employee_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery<EmployeeSort>,
    filter: &EmployeeFilter,
) {
    qb.push(" WHERE TRUE");
    if let Some(role) = filter.role {
        qb.push(" AND role = ");
        qb.push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.as_str());
    }
    push_search(qb, query, &["name", "email", "phone"]);
}

async fn fetch_employee<'e, E>(executor: E, id: EmployeeId, lock: bool) -> StoreResult<Option<Employee>>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = if lock {
        "SELECT * FROM employees WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM employees WHERE id = $1"
    };
    Ok(sqlx::query_as::<_, Db<Employee>>(sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("get_employee", e))?
        .map(Db::into_inner))
}

#[async_trait]
impl EmployeeRepository for PgStore {
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        sqlx::query(
            r#"
            INSERT INTO employees
                (id, name, email, phone, address, role, status, password_hash, joined_on,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*employee.id.as_uuid())
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.role.as_str())
        .bind(employee.status.as_str())
        .bind(&employee.password_hash)
        .bind(employee.joined_on)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_employee", e))?;
        Ok(employee)
    }

    async fn get_employee(&self, id: EmployeeId) -> StoreResult<Employee> {
        fetch_employee(&self.pool, id, false)
            .await?
            .ok_or_else(|| StoreError::not_found("employee"))
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        Ok(
            sqlx::query_as::<_, Db<Employee>>("SELECT * FROM employees WHERE email = $1")
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_employee_by_email", e))?
                .map(Db::into_inner),
        )
    }

    async fn list_employees(
        &self,
        query: &ListQuery<EmployeeSort>,
        filter: &EmployeeFilter,
    ) -> StoreResult<Page<Employee>> {
        let mut counter = QueryBuilder::new("SELECT COUNT(*) FROM employees");
        push_employee_filters(&mut counter, query, filter);
        let total: i64 = counter
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_employees", e))?;

        let mut select = QueryBuilder::new("SELECT * FROM employees");
        push_employee_filters(&mut select, query, filter);
        push_page(&mut select, query);
        let items = select
            .build_query_as::<Db<Employee>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_employees", e))?
            .into_iter()
            .map(Db::into_inner)
            .collect();

        Ok(Page::new(items, count(total), query))
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        update: UpdateEmployee,
        actor: EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let mut tx = self.begin().await?;
        let Some(mut employee) = fetch_employee(&mut *tx, id, true).await? else {
            return abort(tx, StoreError::not_found("employee")).await;
        };
        if let Err(e) = employee.apply_update(update, actor, now) {
            return abort(tx, e.into()).await;
        }
        sqlx::query(
            r#"
            UPDATE employees
            SET name = $1, email = $2, phone = $3, address = $4, role = $5, status = $6,
                updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(employee.role.as_str())
        .bind(employee.status.as_str())
        .bind(employee.updated_at)
        .bind(*id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_employee", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(employee)
    }

    async fn set_employee_password(
        &self,
        id: EmployeeId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE employees SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(password_hash)
                .bind(now)
                .bind(*id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("set_employee_password", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("employee"));
        }
        Ok(())
    }

    async fn delete_employee(&self, id: EmployeeId, actor: EmployeeId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let Some(employee) = fetch_employee(&mut *tx, id, true).await? else {
            return abort(tx, StoreError::not_found("employee")).await;
        };
        if let Err(e) = employee.ensure_deletable_by(actor) {
            return abort(tx, e.into()).await;
        }
        sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_employee", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn count_employees(&self) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_employees", e))?;
        Ok(count(n))
    }
}
