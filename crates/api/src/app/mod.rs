//! HTTP application wiring.
//!
//! - `services.rs`: storage, token issuing and upload handling shared by handlers
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response bodies and query-string parsing
//! - `extract.rs`: JSON body extraction with the API error envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use stockroom_infra::{AppConfig, Store};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Multipart framing on top of the file itself.
const BODY_SLACK_BYTES: usize = 64 * 1024;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .and_then(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS_ORIGIN");
                None
            }
        });

    match origin {
        // Cookies only flow to an exact origin.
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        None => CorsLayer::permissive(),
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: AppConfig, store: Arc<dyn Store>) -> Router {
    let body_limit = config.max_upload_bytes + BODY_SLACK_BYTES;
    let cors = cors_layer(&config);
    let upload_dir = config.upload_dir.clone();
    let services = Arc::new(services::AppServices::new(config, store));

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        services.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
