//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use stockroom_auth::{AuthzError, PasswordError, TokenError};
use stockroom_core::DomainError;
use stockroom_infra::StoreError;
use stockroom_invoicing::RenderError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid e-mail or password")]
    InvalidCredentials,

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Store(StoreError::from(e))
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => ApiError::Internal(msg),
            _ => ApiError::Unauthenticated,
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation { .. } => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound { entity } => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated => {
                json_error(StatusCode::UNAUTHORIZED, "unauthenticated", self.to_string())
            }
            ApiError::InvalidCredentials => {
                json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", self.to_string())
            }
            ApiError::Forbidden(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::InvalidBody(_) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            ApiError::PayloadTooLarge(msg) => {
                json_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
            }
            ApiError::Store(err) => match err {
                StoreError::NotFound { entity } => {
                    json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
                }
                StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
                StoreError::Domain(e) => domain_error_to_response(e),
                StoreError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    axum::Json(json!({
                        "error": "insufficient_stock",
                        "message": format!(
                            "insufficient stock for product {product_id}: available {available}, requested {requested}"
                        ),
                        "details": {
                            "product_id": product_id,
                            "available": available,
                            "requested": requested,
                        },
                    })),
                )
                    .into_response(),
                StoreError::Database(e) => {
                    tracing::error!(error = %e, "storage failure");
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
                }
                StoreError::Unavailable(msg) => {
                    tracing::error!(error = %msg, "storage unavailable");
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage unavailable")
                }
            },
        }
    }
}
