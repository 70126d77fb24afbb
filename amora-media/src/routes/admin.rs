use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::middleware::ModeratorUser;
use amora_shared::types::pagination::{Paginated, PaginationParams};
use amora_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{AssetKind, MediaReport};
use crate::services::report_service::{self, ReviewAction};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

// --- GET /admin/reports ---

pub async fn list_reports(
    _moderator: ModeratorUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<MediaReport>>>> {
    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };

    let paginated = report_service::list_reports(&state, &pagination, params.status.as_deref())?;
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- PUT /admin/reports/:id/review ---

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub action: String,
}

pub async fn review_report(
    moderator: ModeratorUser,
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<Uuid>,
    Json(body): Json<ReviewReportRequest>,
) -> AppResult<Json<ApiResponse<MediaReport>>> {
    let action: ReviewAction = body
        .action
        .parse()
        .map_err(AppError::Validation)?;

    let outcome = report_service::review_report(&state, moderator.0.id, report_id, action)?;

    if let Some((old_status, new_status)) = outcome.asset_status {
        let kind: AssetKind = outcome
            .report
            .asset_kind
            .parse()
            .map_err(|e: String| AppError::internal(e))?;
        publisher::publish_asset_moderated(
            &state.rabbitmq,
            kind,
            outcome.report.asset_id,
            outcome.report.owner_id,
            old_status,
            new_status,
        )
        .await;
    }

    Ok(Json(ApiResponse::ok(outcome.report)))
}
