//! Login and logout
//!
//! A successful login returns a token and also opens a server-side session
//! carried in the session cookie, so either can authenticate later requests.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    routing::post,
    Json, Router,
};
use tracing::warn;
use voto_core::models::LoginRequest;

use super::{middleware::cookie_value, success, AppResult, AppState};

pub fn create_login_router() -> Router<AppState> {
    Router::new()
        .route("/", post(login))
        .route("/logout", post(logout))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let authenticated = state.services.user_service.login(req).await?;

    let session_id = state
        .services
        .session_store
        .create(&authenticated.user.principal())
        .await?;
    let cookie = state.session_cookie.issue(&session_id);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(authenticated),
    ))
}

/// Destroy the session, if any, and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(session_id) = cookie_value(&headers, &state.session_cookie.name) {
        if let Err(e) = state.services.session_store.destroy(session_id).await {
            warn!(error = %e, "Failed to destroy session on logout");
        }
    }

    (
        AppendHeaders([(header::SET_COOKIE, state.session_cookie.clear())]),
        success(),
    )
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use voto_core::models::{Principal, UserId, UserType};

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let state = test_state();
        let principal = Principal {
            user_id: UserId::from("student00001"),
            user_name: "sam".to_string(),
            user_type: UserType::Student,
        };
        let sessions = state.services.session_store.clone();
        let session_id = sessions.create(&principal).await.unwrap();

        let response = test_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/login/logout")
                    .header(header::COOKIE, format!("id={session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(sessions.get(&session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_missing_fields_fails() {
        let response = test_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"password":"pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "ER_LOGIN_FAILED");
    }
}
