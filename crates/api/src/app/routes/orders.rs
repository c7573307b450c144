use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use stockroom_auth::Permission;
use stockroom_core::OrderId;
use stockroom_infra::store::OrderRepository;
use stockroom_sales::{NewOrder, OrderSort};

use crate::app::dto::{ListParams, OrderParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/fulfill", post(fulfill_order))
        .route("/:id/cancel", post(cancel_order))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(params): Query<OrderParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::ORDERS_READ)?;
    let page = services
        .store
        .list_orders(&list.query::<OrderSort>()?, &params.filter()?)
        .await?;
    Ok(Json(page))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewOrder>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::ORDERS_WRITE)?;
    let order = services
        .store
        .create_order(body, Some(principal.employee_id()), Utc::now())
        .await?;
    info!(order_id = %order.id, total = %order.total, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::ORDERS_READ)?;
    let id: OrderId = parse_id(&id)?;
    Ok(Json(services.store.get_order(id).await?))
}

/// Issue the order's goods. Responds with the order and the stock out that
/// was created for it.
pub async fn fulfill_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::ORDERS_WRITE)?;
    require(&principal, &Permission::STOCK_OUTS_WRITE)?;
    let id: OrderId = parse_id(&id)?;
    let (order, stock_out) = services
        .store
        .fulfill_order(id, Some(principal.employee_id()), Utc::now())
        .await?;
    info!(order_id = %order.id, stock_out_id = %stock_out.id, "order fulfilled");
    Ok(Json(json!({ "order": order, "stock_out": stock_out })))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::ORDERS_WRITE)?;
    let id: OrderId = parse_id(&id)?;
    let order = services.store.cancel_order(id, Utc::now()).await?;
    info!(order_id = %order.id, "order cancelled");
    Ok(Json(order))
}
