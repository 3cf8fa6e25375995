//! Public contact form and mailing list endpoints (no login required)

use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;
use voto_core::models::{ContactMessage, EmailSignup};

use super::{success, AppResult, AppState};

pub fn create_email_router() -> Router<AppState> {
    Router::new()
        .route("/addMessage", post(add_message))
        .route("/addEmail", post(add_email))
}

pub async fn add_message(
    State(state): State<AppState>,
    Json(message): Json<ContactMessage>,
) -> AppResult<Json<Value>> {
    state.services.contact_service.add_message(message).await?;
    Ok(success())
}

pub async fn add_email(
    State(state): State<AppState>,
    Json(signup): Json<EmailSignup>,
) -> AppResult<Json<Value>> {
    state.services.contact_service.add_email(signup).await?;
    Ok(success())
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_invalid_email_rejected_without_login() {
        let response = test_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/email/addEmail")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"not-an-address"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
