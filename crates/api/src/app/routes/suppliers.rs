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

use stockroom_auth::Permission;
use stockroom_core::SupplierId;
use stockroom_infra::store::SupplierRepository;
use stockroom_parties::{NewSupplier, Supplier, SupplierSort, UpdateSupplier};

use crate::app::dto::{ListParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::SUPPLIERS_READ)?;
    let page = services
        .store
        .list_suppliers(&list.query::<SupplierSort>()?)
        .await?;
    Ok(Json(page))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewSupplier>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier = Supplier::create(body, Utc::now())?;
    let supplier = services.store.create_supplier(supplier).await?;
    info!(supplier_id = %supplier.id, "supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::SUPPLIERS_READ)?;
    let id: SupplierId = parse_id(&id)?;
    Ok(Json(services.store.get_supplier(id).await?))
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateSupplier>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let id: SupplierId = parse_id(&id)?;
    Ok(Json(services.store.update_supplier(id, body).await?))
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let id: SupplierId = parse_id(&id)?;
    services.store.delete_supplier(id).await?;
    info!(supplier_id = %id, "supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}
