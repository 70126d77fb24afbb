use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{AssetKind, MediaReport};
use crate::services::report_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub asset_kind: String,
    pub asset_id: Uuid,
    pub reason: String,
    #[validate(length(max = 1000, message = "description is limited to 1000 characters"))]
    pub description: Option<String>,
}

// --- POST /reports ---

pub async fn create_report(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<MediaReport>>> {
    body.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let kind: AssetKind = body
        .asset_kind
        .parse()
        .map_err(AppError::Validation)?;

    let (report, _escalated) = report_service::create_report(
        &state,
        user.id,
        kind,
        body.asset_id,
        &body.reason,
        body.description,
    )?;

    publisher::publish_report_created(
        &state.rabbitmq,
        report.id,
        report.reporter_id,
        report.owner_id,
        &report.asset_kind,
        report.asset_id,
        &report.reason,
    )
    .await;

    Ok(Json(ApiResponse::ok(report)))
}
