//! Question image upload and removal

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use super::{error::storage_delete_error, middleware::AuthUser, AppError, AppResult, AppState};

pub fn create_media_router() -> Router<AppState> {
    Router::new()
        .route("/", delete(delete_without_name))
        .route("/uploadImageFile", post(upload_image))
        .route("/url/{img_file_name}", get(image_url))
        .route("/{img_file_name}", delete(delete_image))
}

/// Store the `file` field of a multipart form and return its key and URL.
/// Teachers only.
pub async fn upload_image(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        let (key, url) = state
            .services
            .slide_service
            .upload_image(&principal, &file_name, data)
            .await?;
        return Ok(Json(json!({ "url": url, "imgFileName": key })));
    }

    Err(AppError::bad_request("MISSING_FILE_NAME"))
}

pub async fn image_url(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(img_file_name): Path<String>,
) -> AppResult<Json<Value>> {
    let url = state.services.image_store.url(&img_file_name).await?;
    Ok(Json(json!({ "url": url })))
}

pub async fn delete_image(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    Path(img_file_name): Path<String>,
) -> AppResult<&'static str> {
    state
        .services
        .slide_service
        .delete_image(&principal, &img_file_name)
        .await
        .map_err(storage_delete_error)?;
    Ok("SUCCESS")
}

/// `DELETE /api/media` with no file name
pub async fn delete_without_name(_auth: AuthUser) -> AppError {
    AppError::bad_request("MISSING_FILE_NAME")
}
