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
use stockroom_core::StockOutId;
use stockroom_infra::store::StockOutRepository;
use stockroom_sales::{NewStockOut, StockOutSort};

use crate::app::dto::{ListParams, RangeParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stock_outs).post(create_stock_out))
        .route("/:id", get(get_stock_out).delete(delete_stock_out))
}

pub async fn list_stock_outs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(range): Query<RangeParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::STOCK_OUTS_READ)?;
    let page = services
        .store
        .list_stock_outs(&list.query::<StockOutSort>()?, &range.stock_out_filter()?)
        .await?;
    Ok(Json(page))
}

pub async fn create_stock_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewStockOut>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::STOCK_OUTS_WRITE)?;
    let stock_out = services
        .store
        .create_stock_out(body, Some(principal.employee_id()), Utc::now())
        .await?;
    info!(
        stock_out_id = %stock_out.id,
        reference = %stock_out.reference,
        total = %stock_out.total,
        "stock issued"
    );
    Ok((StatusCode::CREATED, Json(stock_out)))
}

pub async fn get_stock_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::STOCK_OUTS_READ)?;
    let id: StockOutId = parse_id(&id)?;
    Ok(Json(services.store.get_stock_out(id).await?))
}

pub async fn delete_stock_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::STOCK_OUTS_DELETE)?;
    let id: StockOutId = parse_id(&id)?;
    services.store.delete_stock_out(id).await?;
    info!(stock_out_id = %id, "stock out deleted, stock restored");
    Ok(StatusCode::NO_CONTENT)
}
