//! Live session HTTP handlers: what students see and what they answer

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use voto_core::models::{PresentationId, SaveResponseRequest, SlideId};

use super::{middleware::AuthUser, success, AppResult, AppState};

pub fn create_session_router() -> Router<AppState> {
    Router::new()
        .route("/active", get(active_sessions))
        .route(
            "/saveResponse/{presentation_id}/{slide_id}",
            post(save_response),
        )
        .route("/{presentation_id}/responses", get(list_responses))
}

/// Active presentations in the caller's classes
pub async fn active_sessions(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let sessions = state
        .services
        .live_session_service
        .active_sessions(&principal.user_id)
        .await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// Record an answer; the presentation owner is notified on their private channel
pub async fn save_response(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path((presentation_id, slide_id)): Path<(PresentationId, SlideId)>,
    Json(req): Json<SaveResponseRequest>,
) -> AppResult<Json<Value>> {
    state
        .live
        .save_response(
            &principal.user_id,
            &presentation_id,
            &slide_id,
            req.answer.as_deref(),
        )
        .await?;
    Ok(success())
}

pub async fn list_responses(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(presentation_id): Path<PresentationId>,
) -> AppResult<Json<Value>> {
    let responses = state
        .services
        .live_session_service
        .responses(&principal.user_id, &presentation_id)
        .await?;
    Ok(Json(json!({ "responses": responses })))
}
