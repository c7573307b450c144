use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};

use stockroom_auth::{burn_verification, verify_password};
use stockroom_infra::store::EmployeeRepository;

use crate::app::dto::{LoginRequest, LoginResponse};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::middleware::{cleared_session_cookie, session_cookie};

fn cookie_header(value: String) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok(headers)
}

/// Check credentials and start a session.
///
/// The token is returned in the body and as an HttpOnly cookie.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(employee) = services.store.find_employee_by_email(&body.email).await? else {
        info!("login for unknown e-mail");
        let rounds = services.config.password_rounds;
        let password = body.password;
        tokio::task::spawn_blocking(move || burn_verification(&password, rounds))
            .await
            .map_err(|e| ApiError::Internal(format!("verify task: {e}")))?;
        return Err(ApiError::InvalidCredentials);
    };

    let stored = employee.password_hash.clone();
    let password = body.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task: {e}")))??;
    if !matches {
        info!(employee_id = %employee.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }
    if !employee.is_active() {
        warn!(employee_id = %employee.id, "suspended employee tried to log in");
        return Err(ApiError::InvalidCredentials);
    }

    let issued = services.jwt.issue(employee.id, employee.role, Utc::now())?;
    let headers = cookie_header(session_cookie(
        &issued.token,
        services.jwt.ttl().num_seconds(),
        services.config.cookie_secure,
    ))?;
    info!(employee_id = %employee.id, role = %employee.role, "employee logged in");

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            employee,
        }),
    ))
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<impl IntoResponse, ApiError> {
    let headers = cookie_header(cleared_session_cookie(services.config.cookie_secure))?;
    Ok((StatusCode::NO_CONTENT, headers))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = services.store.get_employee(principal.employee_id()).await?;
    Ok(Json(serde_json::json!({
        "employee": employee,
        "permissions": principal
            .principal()
            .permissions()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>(),
    })))
}
