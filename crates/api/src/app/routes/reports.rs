use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};

use stockroom_auth::Permission;
use stockroom_infra::store::ReportRepository;
use stockroom_inventory::StockReport;

use crate::app::dto::StockReportParams;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/stock", get(stock_report))
}

/// Stock levels with status classification. `search` narrows the product
/// set (code, name or category) before the summary is computed; `status`
/// only narrows the listed rows.
pub async fn stock_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(params): Query<StockReportParams>,
) -> Result<impl IntoResponse, ApiError> {
    require(&principal, &Permission::REPORTS_READ)?;
    let status = params.status()?;
    let mut rows = services.store.stock_rows().await?;
    if let Some(term) = params.search() {
        rows.retain(|r| {
            r.code.to_lowercase().contains(&term)
                || r.name.to_lowercase().contains(&term)
                || r
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&term))
        });
    }
    Ok(Json(StockReport::build(rows, status)?))
}
