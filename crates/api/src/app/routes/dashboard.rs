use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use stockroom_auth::Permission;
use stockroom_infra::reports::{validate_months, validate_top_limit};
use stockroom_infra::store::ReportRepository;

use crate::app::dto::{ChartParams, TopProductsParams};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/charts", get(charts))
        .route("/top-products", get(top_products))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::DASHBOARD_READ)?;
    let today = Utc::now().date_naive();
    Ok(Json(services.store.dashboard_summary(today).await?))
}

/// Purchases, sales, expenses and gross profit per month, oldest first.
pub async fn charts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<ChartParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::DASHBOARD_READ)?;
    let months = validate_months(params.months()?)?;
    let today = Utc::now().date_naive();
    let series = services.store.monthly_chart(today, months).await?;
    Ok(Json(json!({ "months": series })))
}

pub async fn top_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<TopProductsParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::DASHBOARD_READ)?;
    let limit = validate_top_limit(params.limit()?)?;
    let products = services.store.top_products(limit).await?;
    Ok(Json(json!({ "products": products })))
}
