use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult};

use crate::moderation::status::ModerationStatus;
use crate::schema::photos;
use crate::services::verification_service::{self, VerificationStatus};
use crate::AppState;

// Service-to-service endpoints. Not proxied by the gateway, no auth.

#[derive(Debug, Deserialize)]
pub struct SummariesRequest {
    pub owner_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Queryable)]
pub struct PhotoSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub moderation_status: String,
    pub privacy: String,
    pub display_order: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

// --- POST /internal/media/summaries ---

pub async fn batch_summaries(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SummariesRequest>,
) -> AppResult<Json<Vec<PhotoSummary>>> {
    if body.owner_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let summaries = photos::table
        .filter(photos::owner_id.eq_any(&body.owner_ids))
        .filter(photos::is_deleted.eq(false))
        .filter(photos::moderation_status.ne(ModerationStatus::Rejected.to_string()))
        .select((
            photos::id,
            photos::owner_id,
            photos::moderation_status,
            photos::privacy,
            photos::display_order,
            photos::is_primary,
            photos::created_at,
        ))
        .order((photos::owner_id.asc(), photos::display_order.asc()))
        .load::<PhotoSummary>(&mut conn)?;

    Ok(Json(summaries))
}

// --- GET /internal/verification/:user_id ---

pub async fn get_verification(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<VerificationStatus>> {
    let status = verification_service::status(&state, user_id)?;
    Ok(Json(status))
}
