//! Slide HTTP handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::debug;
use voto_core::models::SlideId;

use super::{error::storage_delete_error, middleware::AuthUser, success, AppResult, AppState};

pub fn create_slide_router() -> Router<AppState> {
    Router::new()
        .route("/slide/{slide_id}", get(get_slide))
        .route("/{slide_id}/activate", post(activate))
        .route("/{slide_id}/de-activate", post(deactivate))
        .route("/{slide_id}/image/{img_file_name}", delete(delete_slide))
}

pub async fn activate(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(slide_id): Path<SlideId>,
) -> AppResult<&'static str> {
    state
        .live
        .set_slide_active(&principal.user_id, &slide_id, true)
        .await?;
    Ok("ACTIVATED")
}

pub async fn deactivate(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(slide_id): Path<SlideId>,
) -> AppResult<&'static str> {
    state
        .live
        .set_slide_active(&principal.user_id, &slide_id, false)
        .await?;
    Ok("DE_ACTIVATED")
}

/// Slide with a short-lived image URL
pub async fn get_slide(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(slide_id): Path<SlideId>,
) -> AppResult<Json<Value>> {
    let (slide, url) = state
        .services
        .slide_service
        .get_with_url(&principal.user_id, &slide_id)
        .await?;
    Ok(Json(json!({ "slide": slide, "url": url })))
}

/// Delete a slide and then its image. The stored file name is used; the
/// path segment is only logged.
pub async fn delete_slide(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path((slide_id, img_file_name)): Path<(SlideId, String)>,
) -> AppResult<Json<Value>> {
    let slide = state
        .services
        .slide_service
        .delete_with_image(&principal.user_id, &slide_id)
        .await
        .map_err(storage_delete_error)?;

    if slide.img_file_name != img_file_name {
        debug!(
            slide_id = %slide_id,
            requested = %img_file_name,
            stored = %slide.img_file_name,
            "Image name in path differs from stored name"
        );
    }
    Ok(success())
}

#[cfg(test)]
mod tests {
    use crate::http::test_support::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use voto_core::{
        models::{ClassId, NewSlide, PresentationId, SlideId, UserType},
        repository::{ClassRepository, PresentationRepository, SlideRepository, UserRepository},
    };
    use voto_realtime::Channel;

    fn request(method: &str, uri: &str, auth: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_activate_requires_login() {
        let response = test_router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/slides/q1/activate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "ERR_NOT_LOGGED_IN");
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_slide_lifecycle_over_http() {
        let (state, pool) = db_state().await;
        let teacher = create_user(&pool, UserType::Teacher).await;
        let granted = create_user(&pool, UserType::Student).await;
        let outsider = create_user(&pool, UserType::Student).await;
        let class = ClassRepository::new(pool.clone())
            .create(&ClassId::new(), &teacher.id, "PHY 101", None)
            .await
            .unwrap();
        ClassRepository::new(pool.clone())
            .set_access(&teacher.id, &class.id, &granted.id, true)
            .await
            .unwrap();
        let presentation = PresentationRepository::new(pool.clone())
            .create(&PresentationId::new(), &teacher.id, &class.id, "Forces", None)
            .await
            .unwrap()
            .unwrap();
        let slide = SlideRepository::new(pool.clone())
            .create(
                &SlideId::new(),
                &teacher.id,
                &NewSlide {
                    presentation_id: presentation.id.clone(),
                    img_file_name: "q1.png".to_string(),
                    question: "Which force?".to_string(),
                    order_number: 1,
                    correct_answer: "B".to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        let hub = state.live.hub().clone();
        let mut watcher = hub.register("watcher".to_string(), granted.id.clone());
        hub.join("watcher", Channel::Presentation(presentation.id.clone()))
            .unwrap();

        let router = test_router(state.clone());
        let teacher_auth = bearer(&state, &teacher);
        let granted_auth = bearer(&state, &granted);
        let outsider_auth = bearer(&state, &outsider);
        let slide_uri = format!("/api/slides/slide/{}", slide.id);

        let response = router
            .clone()
            .oneshot(request("POST", &format!("/api/slides/{}/activate", slide.id), &granted_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "ERR_TOGGLE_FAILURE");

        let response = router
            .clone()
            .oneshot(request("POST", &format!("/api/slides/{}/activate", slide.id), &teacher_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ACTIVATED");
        assert_eq!(watcher.recv().await.unwrap().event_type(), "slide-active");

        let response = router
            .clone()
            .oneshot(request("GET", &slide_uri, &granted_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["url"], "https://images.example.com/q1.png");

        let response = router
            .clone()
            .oneshot(request("GET", &slide_uri, &outsider_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "UN_AUTHORIZED");

        let response = router
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/slides/{}/image/q1.png", slide.id),
                &teacher_auth,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(request("GET", &slide_uri, &teacher_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "ER_CANT_GET_QUESTION");

        let users = UserRepository::new(pool);
        for user in [&granted, &outsider, &teacher] {
            users.delete(&user.id).await.unwrap();
        }
    }
}
