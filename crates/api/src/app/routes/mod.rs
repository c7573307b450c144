use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod dashboard;
pub mod employees;
pub mod expenses;
pub mod goods_receives;
pub mod orders;
pub mod products;
pub mod reports;
pub mod stock_outs;
pub mod suppliers;
pub mod system;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .nest("/employees", employees::router())
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/goods-receives", goods_receives::router())
        .nest("/stock-outs", stock_outs::router())
        .nest("/orders", orders::router())
        .nest("/expenses", expenses::router())
        .nest("/dashboard", dashboard::router())
        .nest("/reports", reports::router())
}
