use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use tracing::info;

use stockroom_auth::{
    Employee, EmployeeSort, NewEmployee, Permission, UpdateEmployee, check_password_strength,
    hash_password, verify_password,
};
use stockroom_core::EmployeeId;
use stockroom_infra::store::EmployeeRepository;

use crate::app::dto::{ChangePasswordRequest, EmployeeParams, ListParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/:id/password", put(change_password))
}

async fn hash(services: &AppServices, password: String) -> Result<String, ApiError> {
    let rounds = services.config.password_rounds;
    Ok(
        tokio::task::spawn_blocking(move || hash_password(&password, rounds))
            .await
            .map_err(|e| ApiError::Internal(format!("hash task: {e}")))??,
    )
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(params): Query<EmployeeParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EMPLOYEES_READ)?;
    let page = services
        .store
        .list_employees(&list.query::<EmployeeSort>()?, &params.filter()?)
        .await?;
    Ok(Json(page))
}

pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewEmployee>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EMPLOYEES_WRITE)?;
    body.validate()?;
    let password_hash = hash(&services, body.password.clone()).await?;
    let employee = Employee::create(body, password_hash, Utc::now())?;
    let employee = services.store.create_employee(employee).await?;
    info!(employee_id = %employee.id, role = %employee.role, "employee created");
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn get_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: EmployeeId = parse_id(&id)?;
    if id != principal.employee_id() {
        require(&principal, &Permission::EMPLOYEES_READ)?;
    }
    Ok(Json(services.store.get_employee(id).await?))
}

pub async fn update_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateEmployee>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EMPLOYEES_WRITE)?;
    let id: EmployeeId = parse_id(&id)?;
    let employee = services
        .store
        .update_employee(id, body, principal.employee_id(), Utc::now())
        .await?;
    Ok(Json(employee))
}

pub async fn delete_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::EMPLOYEES_WRITE)?;
    let id: EmployeeId = parse_id(&id)?;
    services
        .store
        .delete_employee(id, principal.employee_id())
        .await?;
    info!(employee_id = %id, "employee deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Employees may change their own password (proving the current one);
/// changing someone else's needs `employees.write`.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: EmployeeId = parse_id(&id)?;
    let employee = if id == principal.employee_id() {
        let employee = services.store.get_employee(id).await?;
        let current = body.current_password.clone().unwrap_or_default();
        let stored = employee.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&current, &stored))
            .await
            .map_err(|e| ApiError::Internal(format!("verify task: {e}")))??;
        if !ok {
            return Err(ApiError::InvalidCredentials);
        }
        employee
    } else {
        require(&principal, &Permission::EMPLOYEES_WRITE)?;
        services.store.get_employee(id).await?
    };

    check_password_strength(&body.password)?;
    let password_hash = hash(&services, body.password).await?;
    services
        .store
        .set_employee_password(employee.id, password_hash, Utc::now())
        .await?;
    info!(employee_id = %employee.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
