use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::info;

use stockroom_auth::Permission;
use stockroom_core::ProductId;
use stockroom_infra::store::ProductRepository;
use stockroom_products::{ImageKind, NewProduct, Product, ProductSort, UpdateProduct};

use crate::app::dto::{ListParams, ProductParams, parse_id};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

const IMAGE_FIELD: &str = "image";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/image", post(upload_image).delete(remove_image))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(list): Query<ListParams>,
    Query(params): Query<ProductParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_READ)?;
    let page = services
        .store
        .list_products(&list.query::<ProductSort>()?, &params.filter())
        .await?;
    Ok(Json(page))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_WRITE)?;
    let product = Product::create(body, Utc::now())?;
    let product = services.store.create_product(product).await?;
    info!(product_id = %product.id, code = %product.code, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_READ)?;
    let id: ProductId = parse_id(&id)?;
    Ok(Json(services.store.get_product(id).await?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateProduct>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_WRITE)?;
    let id: ProductId = parse_id(&id)?;
    let product = services.store.update_product(id, body, Utc::now()).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_WRITE)?;
    let id: ProductId = parse_id(&id)?;
    let removed = services.store.delete_product(id).await?;
    if let Some(image) = removed.image.as_deref() {
        services.remove_upload(image).await;
    }
    info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart upload; the file goes in the `image` field.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_WRITE)?;
    let id: ProductId = parse_id(&id)?;

    let mut upload: Option<(ImageKind, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let kind = ImageKind::from_content_type(field.content_type().unwrap_or_default())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?;
        upload = Some((kind, bytes.to_vec()));
        break;
    }

    let Some((kind, bytes)) = upload else {
        return Err(ApiError::BadRequest(format!(
            "multipart field '{IMAGE_FIELD}' is required"
        )));
    };
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }
    if bytes.len() > services.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "image exceeds {} bytes",
            services.config.max_upload_bytes
        )));
    }

    // 404 before anything touches the disk.
    services.store.get_product(id).await?;

    let path = services.store_product_image(id, kind, &bytes).await?;
    let (product, previous) = services
        .store
        .set_product_image(id, Some(path.clone()), Utc::now())
        .await?;
    if let Some(previous) = previous.filter(|p| *p != path) {
        services.remove_upload(&previous).await;
    }
    Ok(Json(product))
}

pub async fn remove_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::PRODUCTS_WRITE)?;
    let id: ProductId = parse_id(&id)?;
    let (product, previous) = services.store.set_product_image(id, None, Utc::now()).await?;
    if let Some(previous) = previous {
        services.remove_upload(&previous).await;
    }
    Ok(Json(product))
}
