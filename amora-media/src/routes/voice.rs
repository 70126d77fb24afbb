use axum::extract::{Multipart, Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::middleware::OptionalAuthUser;
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::VoiceClip;
use crate::services::voice_service::{self, VoiceClipView};
use crate::AppState;

// --- POST /voice ---

pub async fn upload_voice(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<VoiceClip>>> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut duration_secs: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::VoiceUploadFailed, format!("failed to read multipart: {e}")))?
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
                    .map_err(|e| AppError::new(ErrorCode::VoiceUploadFailed, format!("failed to read file data: {e}")))?;
                file = Some((data.to_vec(), content_type));
            }
            Some("duration_secs") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::VoiceUploadFailed, format!("failed to read duration field: {e}")))?;
                duration_secs = Some(
                    raw.parse()
                        .map_err(|_| AppError::Validation("duration_secs must be an integer".into()))?,
                );
            }
            _ => {}
        }
    }

    let (data, content_type) =
        file.ok_or_else(|| AppError::new(ErrorCode::VoiceUploadFailed, "no file provided"))?;
    let duration_secs = duration_secs
        .ok_or_else(|| AppError::Validation("duration_secs field is required".into()))?;

    let clip = voice_service::upload_voice(&state, user.id, &data, &content_type, duration_secs).await?;

    publisher::publish_voice_uploaded(&state.rabbitmq, clip.id, clip.owner_id, clip.duration_secs)
        .await;

    Ok(Json(ApiResponse::ok(clip)))
}

// --- GET /voice/me ---

pub async fn get_my_voice(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<VoiceClip>>> {
    let clip = voice_service::get_own_clip(&state, user.id)?;
    Ok(Json(ApiResponse::ok(clip)))
}

// --- GET /users/:user_id/voice ---

pub async fn get_user_voice(
    viewer: OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VoiceClipView>>> {
    let viewer_id = viewer.0.map(|u| u.id);
    let view = voice_service::get_clip_view(&state, viewer_id, user_id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

// --- DELETE /voice ---

pub async fn delete_voice(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    voice_service::delete_voice(&state, user.id)?;
    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
