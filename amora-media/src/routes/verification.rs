use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::services::verification_service::{self, VerificationResponse, VerificationStatus};
use crate::AppState;

// --- POST /verification ---

pub async fn verify(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<VerificationResponse>>> {
    let mut capture: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("failed to read multipart: {e}")))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().unwrap_or("application/octet-stream");
            if !matches!(content_type, "image/jpeg" | "image/jpg" | "image/png") {
                return Err(AppError::new(
                    ErrorCode::InvalidImageFormat,
                    "capture must be jpeg or png",
                ));
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::bad_request(format!("failed to read capture: {e}")))?;
            capture = Some(data.to_vec());
        }
    }

    let capture = capture.ok_or_else(|| AppError::bad_request("no capture provided"))?;

    let response = verification_service::verify(&state, user.id, &capture).await?;

    publisher::publish_verification_completed(
        &state.rabbitmq,
        user.id,
        response.outcome.as_str(),
        response.similarity,
    )
    .await;

    Ok(Json(ApiResponse::ok(response)))
}

// --- GET /verification/status ---

pub async fn get_status(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<VerificationStatus>>> {
    let status = verification_service::status(&state, user.id)?;
    Ok(Json(ApiResponse::ok(status)))
}
