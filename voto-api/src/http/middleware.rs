// HTTP middleware and extractors

use axum::{
    body::Body,
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use voto_core::{models::Principal, service::JwtService};

use super::{AppError, AppState};

/// Authenticated caller, from a bearer token or the session cookie
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let principal = authenticate(&app_state, &parts.headers, None).await?;
        Ok(Self(principal))
    }
}

/// Resolve the caller. A token (explicit, or from the `Authorization`
/// header) is tried first, then the session cookie.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<&str>,
) -> Result<Principal, AppError> {
    let header_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(JwtService::extract_token);

    if let Some(token) = token.filter(|t| !t.is_empty()).or(header_token) {
        let claims = state
            .services
            .jwt_service
            .verify(token)
            .map_err(|_| AppError::unauthorized("ERR_INVALID_TOKEN"))?;
        return Ok(claims.principal());
    }

    if let Some(session_id) = cookie_value(headers, &state.session_cookie.name) {
        if let Some(session) = state.services.session_store.get(session_id).await? {
            return Ok(session.principal);
        }
    }

    Err(AppError::unauthorized("ERR_NOT_LOGGED_IN"))
}

/// Value of a named cookie from the `Cookie` header(s)
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Browsers from the legacy client send the token as an `authorization`
/// field in the JSON body. Lift it into the header when the header is absent.
pub async fn body_authorization(request: Request, next: Next) -> Result<Response, AppError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if !is_json || request.headers().contains_key(header::AUTHORIZATION) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::new(axum::http::StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;

    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_slice(&bytes) {
        if let Some(token) = fields.get("authorization").and_then(serde_json::Value::as_str) {
            if let Ok(value) = HeaderValue::from_str(token) {
                parts.headers.insert(header::AUTHORIZATION, value);
            }
        }
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
