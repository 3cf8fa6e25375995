//! Presentation HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use voto_core::models::{
    CreatePresentationRequest, Presentation, PresentationId, PresentationListQuery, Slide,
    SlideInput, UpdatePresentationRequest,
};

use super::{middleware::AuthUser, AppResult, AppState};

pub fn create_presentation_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_presentations).patch(update_presentation))
        .route("/saveNewPresentation", post(create_presentation))
        .route("/savePresentationSlides", post(save_slides))
        .route(
            "/{presentation_id}",
            get(get_presentation).delete(delete_presentation),
        )
        .route("/{presentation_id}/allSlides", get(list_slides))
        .route("/{presentation_id}/activate", post(activate))
        .route("/{presentation_id}/de-activate", post(deactivate))
}

/// Owned presentations: all, favorites or the most recently used
pub async fn list_presentations(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PresentationListQuery>,
) -> AppResult<Json<Value>> {
    let presentations = state
        .services
        .presentation_service
        .list(&principal.user_id, query.filter())
        .await?;
    Ok(Json(json!({ "presentations": presentations })))
}

pub async fn get_presentation(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<Json<Presentation>> {
    let presentation = state
        .services
        .presentation_service
        .get(&principal.user_id, &presentation_id)
        .await?;
    Ok(Json(presentation))
}

pub async fn list_slides(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<Json<Vec<Slide>>> {
    let slides = state
        .services
        .presentation_service
        .slides(&principal.user_id, &presentation_id)
        .await?;
    Ok(Json(slides))
}

/// Create a presentation and announce it to the class
pub async fn create_presentation(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePresentationRequest>,
) -> AppResult<Json<Presentation>> {
    let presentation = state
        .services
        .presentation_service
        .create(&principal, req)
        .await?;
    state.live.announce_new_session(&presentation);
    Ok(Json(presentation))
}

pub async fn update_presentation(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePresentationRequest>,
) -> AppResult<Json<Presentation>> {
    let presentation = state
        .services
        .presentation_service
        .update(&principal.user_id, req)
        .await?;
    Ok(Json(presentation))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveSlidesRequest {
    #[serde(default)]
    pub slides: Vec<SlideInput>,
}

/// Create or update a batch of slides. Any failed slide makes the whole
/// response a 500 listing the failures.
pub async fn save_slides(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SaveSlidesRequest>,
) -> AppResult<Response> {
    let outcome = state
        .services
        .presentation_service
        .save_slides(&principal.user_id, req.slides)
        .await?;

    if outcome.is_success() {
        Ok(Json(json!({ "questions": outcome.saved })).into_response())
    } else {
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "uploadErrors": [], "dbErrors": outcome.db_errors })),
        )
            .into_response())
    }
}

pub async fn activate(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<&'static str> {
    state
        .live
        .set_presentation_active(&principal.user_id, &presentation_id, true)
        .await?;
    Ok("ACTIVATED")
}

pub async fn deactivate(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<&'static str> {
    state
        .live
        .set_presentation_active(&principal.user_id, &presentation_id, false)
        .await?;
    Ok("DE_ACTIVATED")
}

/// Delete an owned presentation; slide images are removed best-effort
pub async fn delete_presentation(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<&'static str> {
    state
        .services
        .presentation_service
        .delete(&principal.user_id, &presentation_id)
        .await?;
    Ok("SUCCESS")
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use chrono::Utc;
    use tower::ServiceExt;
    use voto_core::models::{User, UserId, UserType};

    fn student() -> User {
        User {
            id: UserId::from("student00001"),
            first_name: "Sam".to_string(),
            last_name: "Student".to_string(),
            user_name: "sam".to_string(),
            email: "sam@example.com".to_string(),
            user_type: UserType::Student,
            password_salt: String::new(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_students_cannot_create_presentations() {
        let state = test_state();
        let token = state.services.jwt_service.sign(&student()).unwrap();

        let response = test_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/presentations/saveNewPresentation")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"classId":"c1","title":"Quiz","description":"Week 1"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "ER_TEACHER_ONLY");
    }

    #[tokio::test]
    async fn test_activate_requires_login() {
        let response = test_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/presentations/p1/activate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "ERR_NOT_LOGGED_IN");
    }
}
