use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use stockroom_infra::StoreError;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Cookie carrying the same token `/auth/login` returns in its body.
pub const SESSION_COOKIE: &str = "stockroom_session";

/// Accept `Authorization: Bearer <token>` or the session cookie, then load
/// the employee so suspended or deleted accounts are locked out at once.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or(ApiError::Unauthenticated)?;
    let claims = services.jwt.validate(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "rejected token");
        ApiError::Unauthenticated
    })?;

    let employee = match services.store.get_employee(claims.sub).await {
        Ok(e) => e,
        Err(StoreError::NotFound { .. }) => return Err(ApiError::Unauthenticated),
        Err(e) => return Err(e.into()),
    };
    if !employee.is_active() {
        debug!(employee_id = %employee.id, "suspended employee rejected");
        return Err(ApiError::Unauthenticated);
    }

    req.extensions_mut()
        .insert(PrincipalContext::new(employee.id, employee.role));

    Ok(next.run(req).await)
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| extract_cookie(headers, SESSION_COOKIE))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

/// `Set-Cookie` value for a freshly issued session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session.
pub fn cleared_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("stockroom_session=def"));
        assert_eq!(extract_token(&headers), Some("abc"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; stockroom_session=tok123; lang=en"),
        );
        assert_eq!(extract_token(&headers), Some("tok123"));
    }

    #[test]
    fn missing_or_empty_credentials() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(header::COOKIE, HeaderValue::from_static("stockroom_session="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn session_cookie_flags() {
        let c = session_cookie("t", 60, true);
        assert!(c.starts_with("stockroom_session=t;"));
        assert!(c.contains("HttpOnly"));
        assert!(c.ends_with("; Secure"));
        assert!(cleared_session_cookie(false).contains("Max-Age=0"));
    }
}
