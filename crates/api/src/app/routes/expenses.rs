use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::info;

use stockroom_accounting::{Expense, ExpenseSort, NewExpense, UpdateExpense};
use stockroom_auth::Permission;
use stockroom_core::ExpenseId;
use stockroom_infra::store::ExpenseRepository;

use crate::app::dto::{ExpenseParams, ListParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/summary", get(expense_summary))
        .route(
            "/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

pub async fn list_expenses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(params): Query<ExpenseParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_READ)?;
    let page = services
        .store
        .list_expenses(&list.query::<ExpenseSort>()?, &params.filter()?)
        .await?;
    Ok(Json(page))
}

/// Totals per category over the filtered expenses.
pub async fn expense_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<ExpenseParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_READ)?;
    Ok(Json(services.store.expense_summary(&params.filter()?).await?))
}

pub async fn create_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewExpense>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_WRITE)?;
    let expense = Expense::create(body, Some(principal.employee_id()), Utc::now())?;
    let expense = services.store.create_expense(expense).await?;
    info!(expense_id = %expense.id, amount = %expense.amount, "expense recorded");
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn get_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_READ)?;
    let id: ExpenseId = parse_id(&id)?;
    Ok(Json(services.store.get_expense(id).await?))
}

pub async fn update_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateExpense>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_WRITE)?;
    let id: ExpenseId = parse_id(&id)?;
    Ok(Json(services.store.update_expense(id, body).await?))
}

pub async fn delete_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EXPENSES_WRITE)?;
    let id: ExpenseId = parse_id(&id)?;
    services.store.delete_expense(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
