//! Class HTTP handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use voto_core::{
    models::{Class, ClassId, CreateClassRequest, UpdateClassRequest, UserId},
    service::parse_allow_access,
};

use super::{middleware::AuthUser, success, AppResult, AppState};

pub fn create_class_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class).patch(update_class))
        .route("/{class_id}", delete(delete_class))
        .route("/{class_id}/members", get(list_members))
        .route("/{class_id}/access/{user_id}/{allow_access}", post(change_access))
}

/// Owned and granted classes
pub async fn list_classes(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let classes = state.services.class_service.list(&principal.user_id).await?;
    Ok(Json(json!({ "classes": classes })))
}

pub async fn create_class(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateClassRequest>,
) -> AppResult<Json<Class>> {
    let class = state.services.class_service.create(&principal, req).await?;
    Ok(Json(class))
}

pub async fn update_class(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateClassRequest>,
) -> AppResult<Json<Class>> {
    let class = state
        .services
        .class_service
        .update(&principal.user_id, req)
        .await?;
    Ok(Json(class))
}

pub async fn delete_class(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
) -> AppResult<Json<Value>> {
    state.live.delete_class(&principal.user_id, &class_id).await?;
    Ok(success())
}

pub async fn list_members(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
) -> AppResult<Json<Value>> {
    let members = state
        .services
        .class_service
        .members(&principal.user_id, &class_id)
        .await?;
    Ok(Json(json!({ "members": members })))
}

pub async fn change_access(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path((class_id, user_id, allow_access)): Path<(ClassId, UserId, String)>,
) -> AppResult<Json<Value>> {
    let allow = parse_allow_access(&allow_access)?;
    state
        .live
        .change_class_access(&principal.user_id, &class_id, &user_id, allow)
        .await?;
    Ok(success())
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
    use voto_core::{
        models::{ClassId, PresentationId, User, UserId, UserType},
        repository::{ClassRepository, PresentationRepository, UserRepository},
    };
    use voto_realtime::Channel;

    fn teacher() -> User {
        User {
            id: UserId::from("teacher00001"),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            user_type: UserType::Teacher,
            password_salt: String::new(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn request(method: &str, uri: &str, auth: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_change_access_rejects_unknown_flag() {
        let state = test_state();
        let auth = bearer(&state, &teacher());

        let response = test_router(state)
            .oneshot(request("POST", "/api/classes/c1/access/u2/sometimes", &auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ER_EMPTY_PARAMETERS");
    }

    #[tokio::test]
    async fn test_update_requires_class_id() {
        let state = test_state();
        let auth = bearer(&state, &teacher());

        let response = test_router(state)
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/classes")
                    .header(header::AUTHORIZATION, auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"className":"PHY 102"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ER_MISSING_FIELDS");
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_revoke_and_delete_close_live_channels() {
        let (state, pool) = db_state().await;
        let owner = create_user(&pool, UserType::Teacher).await;
        let student = create_user(&pool, UserType::Student).await;
        let class = ClassRepository::new(pool.clone())
            .create(&ClassId::new(), &owner.id, "PHY 101", None)
            .await
            .unwrap();
        let presentation = PresentationRepository::new(pool.clone())
            .create(&PresentationId::new(), &owner.id, &class.id, "Forces", None)
            .await
            .unwrap()
            .unwrap();

        let router = test_router(state.clone());
        let owner_auth = bearer(&state, &owner);
        let student_auth = bearer(&state, &student);
        let access_uri = |allow: &str| format!("/api/classes/{}/access/{}/{allow}", class.id, student.id);

        let response = router
            .clone()
            .oneshot(request("POST", &access_uri("true"), &owner_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A student cannot grant themselves anything
        let response = router
            .clone()
            .oneshot(request("POST", &access_uri("true"), &student_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["error"],
            "ER_FAILED_TO_CHANGE_AUTHORIZATION"
        );

        let hub = state.live.hub().clone();
        let _socket = hub.register("student".to_string(), student.id.clone());
        let _owner_socket = hub.register("owner".to_string(), owner.id.clone());
        let class_channel = Channel::Class(class.id.clone());
        let presentation_channel = Channel::Presentation(presentation.id.clone());
        hub.join("student", class_channel.clone()).unwrap();
        hub.join("student", presentation_channel.clone()).unwrap();
        hub.join("owner", class_channel.clone()).unwrap();

        let response = router
            .clone()
            .oneshot(request("POST", &access_uri("false"), &owner_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(hub.channels_of("student").is_empty());
        assert_eq!(hub.subscriber_count(&class_channel), 1);

        let response = router
            .clone()
            .oneshot(request("DELETE", &format!("/api/classes/{}", class.id), &student_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "UN_AUTHORIZED");

        let response = router
            .oneshot(request("DELETE", &format!("/api/classes/{}", class.id), &owner_auth))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hub.subscriber_count(&class_channel), 0);
        assert!(hub.channels_of("owner").is_empty());

        let users = UserRepository::new(pool);
        users.delete(&student.id).await.unwrap();
        users.delete(&owner.id).await.unwrap();
    }
}
