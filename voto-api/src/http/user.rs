//! User account HTTP handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;
use voto_core::{
    models::{AuthenticatedUser, ClassId, CreateUserRequest, UpdatePasswordRequest, User, UserId},
    service::parse_allow_access,
};

use super::{middleware::AuthUser, success, AppResult, AppState};

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", delete(delete_user))
        .route("/createUser", post(create_user))
        .route("/updatePassword", post(update_password))
        .route("/me", get(get_me))
        .route(
            "/changeUserAuthorization/{authorize_id}/{class_id}/{allow_access}",
            post(change_user_authorization),
        )
}

/// Register a new account and return it with a token
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<AuthenticatedUser>> {
    let created = state.services.user_service.register(req).await?;
    Ok(Json(created))
}

pub async fn update_password(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> AppResult<Json<Value>> {
    state
        .services
        .user_service
        .update_password(&principal.user_id, req)
        .await?;
    Ok(success())
}

/// Delete the calling user's account and close their sockets
pub async fn delete_user(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<&'static str> {
    state
        .services
        .user_service
        .delete_user(&principal.user_id)
        .await?;
    state.live.hub().disconnect_user(&principal.user_id);
    Ok("success")
}

pub async fn get_me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    let user = state.services.user_service.get_user(&principal.user_id).await?;
    Ok(Json(user))
}

/// Grant or revoke another user's access to an owned class
pub async fn change_user_authorization(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path((authorize_id, class_id, allow_access)): Path<(UserId, ClassId, String)>,
) -> AppResult<Json<Value>> {
    let allow = parse_allow_access(&allow_access)?;
    state
        .live
        .change_class_access(&principal.user_id, &class_id, &authorize_id, allow)
        .await?;
    Ok(success())
}
