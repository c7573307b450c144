use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::info;

use stockroom_auth::Permission;
use stockroom_core::GoodsReceiveId;
use stockroom_infra::store::GoodsReceiveRepository;
use stockroom_purchasing::{GoodsReceiveSort, NewGoodsReceive};

use crate::app::dto::{GoodsReceiveParams, ListParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_goods_receives).post(create_goods_receive))
        .route(
            "/:id",
            get(get_goods_receive).delete(delete_goods_receive),
        )
        .route("/:id/invoice", get(goods_receive_invoice))
}

pub async fn list_goods_receives(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(params): Query<GoodsReceiveParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::GOODS_RECEIVES_READ)?;
    let page = services
        .store
        .list_goods_receives(&list.query::<GoodsReceiveSort>()?, &params.filter()?)
        .await?;
    Ok(Json(page))
}

pub async fn create_goods_receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewGoodsReceive>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::GOODS_RECEIVES_WRITE)?;
    let receive = services
        .store
        .create_goods_receive(body, Some(principal.employee_id()), Utc::now())
        .await?;
    info!(
        goods_receive_id = %receive.id,
        reference = %receive.reference,
        lines = receive.items.len(),
        "goods received"
    );
    Ok((StatusCode::CREATED, Json(receive)))
}

pub async fn get_goods_receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::GOODS_RECEIVES_READ)?;
    let id: GoodsReceiveId = parse_id(&id)?;
    Ok(Json(services.store.get_goods_receive(id).await?))
}

pub async fn delete_goods_receive(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::GOODS_RECEIVES_WRITE)?;
    let id: GoodsReceiveId = parse_id(&id)?;
    services.store.delete_goods_receive(id).await?;
    info!(goods_receive_id = %id, "goods receive deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Printable PDF invoice, shown inline by browsers.
pub async fn goods_receive_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::GOODS_RECEIVES_READ)?;
    let id: GoodsReceiveId = parse_id(&id)?;
    let (reference, bytes) = services.goods_receive_invoice(id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("inline; filename=\"{reference}.pdf\""))
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok((headers, bytes))
}
