use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::middleware::OptionalAuthUser;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::access::PrivacyLevel;
use crate::events::publisher;
use crate::models::Photo;
use crate::services::photo_service::{self, PhotoView};
use crate::AppState;

// --- POST /photos ---

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Photo>>> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut privacy = PrivacyLevel::Public;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read file data: {e}")))?;
                file = Some((data.to_vec(), content_type));
            }
            Some("privacy") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read privacy field: {e}")))?;
                privacy = raw
                    .parse()
                    .map_err(|e: String| AppError::Validation(e))?;
            }
            _ => {}
        }
    }

    let (data, content_type) =
        file.ok_or_else(|| AppError::new(ErrorCode::PhotoUploadFailed, "no file provided"))?;

    let photo = photo_service::upload_photo(&state, user.id, &data, &content_type, privacy).await?;

    publisher::publish_photo_uploaded(
        &state.rabbitmq,
        photo.id,
        photo.owner_id,
        &photo.privacy,
        photo.is_primary,
    )
    .await;

    Ok(Json(ApiResponse::ok(photo)))
}

// --- GET /photos ---

pub async fn list_my_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Photo>>>> {
    let items = photo_service::list_own_photos(&state, user.id)?;
    Ok(Json(ApiResponse::ok(items)))
}

// --- GET /photos/:id ---

pub async fn get_photo(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PhotoView>>> {
    let viewer_id = viewer.0.map(|u| u.id);
    let view = photo_service::get_photo_view(&state, viewer_id, photo_id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

// --- GET /users/:user_id/photos ---

pub async fn list_user_photos(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<PhotoView>>>> {
    let viewer_id = viewer.0.map(|u| u.id);
    let views = photo_service::list_visible_photos(&state, viewer_id, user_id).await?;
    Ok(Json(ApiResponse::ok(views)))
}

// --- PATCH /photos/:id ---

#[derive(Debug, Deserialize)]
pub struct UpdatePhotoRequest {
    pub privacy: Option<String>,
    pub display_order: Option<i32>,
}

pub async fn update_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
    Json(body): Json<UpdatePhotoRequest>,
) -> AppResult<Json<ApiResponse<Photo>>> {
    let privacy = body
        .privacy
        .as_deref()
        .map(|p| p.parse::<PrivacyLevel>())
        .transpose()
        .map_err(AppError::Validation)?;

    let updated =
        photo_service::update_photo(&state, user.id, photo_id, privacy, body.display_order).await?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- PUT /photos/:id/primary ---

pub async fn set_primary(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Photo>>> {
    let updated = photo_service::set_primary(&state, user.id, photo_id)?;
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /photos/:id ---

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    photo_service::soft_delete(&state, user.id, photo_id)?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
