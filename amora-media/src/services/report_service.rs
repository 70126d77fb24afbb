use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{AssetKind, MediaReport, NewMediaReport, Photo, VoiceClip};
use crate::moderation::status::{transition, Moderatable, ModerationStatus, Transition};
use crate::schema::{media_reports, photos, voice_clips};
use crate::AppState;

pub const REPORT_REASONS: &[&str] = &[
    "nudity",
    "violence",
    "hate",
    "contact_info",
    "impersonation",
    "underage",
    "other",
];

/// What a moderator decided about a reported asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    ApproveAsset,
    RejectAsset,
    Dismiss,
}

impl std::str::FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve_asset" => Ok(ReviewAction::ApproveAsset),
            "reject_asset" => Ok(ReviewAction::RejectAsset),
            "dismiss" => Ok(ReviewAction::Dismiss),
            _ => Err(format!("unknown review action: {s}")),
        }
    }
}

/// Either reportable entity, adapted to the shared moderation state
/// machine so escalation and override logic is written once.
enum ReportedAsset {
    Photo(Photo),
    Voice(VoiceClip),
}

impl Moderatable for ReportedAsset {
    fn status(&self) -> ModerationStatus {
        match self {
            ReportedAsset::Photo(p) => p.status(),
            ReportedAsset::Voice(v) => v.status(),
        }
    }

    fn set_status(&mut self, status: ModerationStatus) {
        match self {
            ReportedAsset::Photo(p) => p.set_status(status),
            ReportedAsset::Voice(v) => v.set_status(status),
        }
    }

    fn owner_id(&self) -> Uuid {
        match self {
            ReportedAsset::Photo(p) => p.owner_id,
            ReportedAsset::Voice(v) => v.owner_id,
        }
    }
}

fn load_asset(
    conn: &mut diesel::PgConnection,
    kind: AssetKind,
    asset_id: Uuid,
) -> AppResult<ReportedAsset> {
    let asset = match kind {
        AssetKind::Photo => photos::table
            .find(asset_id)
            .filter(photos::is_deleted.eq(false))
            .first::<Photo>(conn)
            .optional()?
            .map(ReportedAsset::Photo),
        AssetKind::Voice => voice_clips::table
            .find(asset_id)
            .filter(voice_clips::is_deleted.eq(false))
            .first::<VoiceClip>(conn)
            .optional()?
            .map(ReportedAsset::Voice),
    };

    asset.ok_or_else(|| AppError::not_found("asset not found"))
}

fn store_asset_status(
    conn: &mut diesel::PgConnection,
    kind: AssetKind,
    asset_id: Uuid,
    status: ModerationStatus,
) -> AppResult<()> {
    match kind {
        AssetKind::Photo => {
            diesel::update(photos::table.find(asset_id))
                .set((
                    photos::moderation_status.eq(status.to_string()),
                    photos::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }
        AssetKind::Voice => {
            diesel::update(voice_clips::table.find(asset_id))
                .set((
                    voice_clips::moderation_status.eq(status.to_string()),
                    voice_clips::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }
    }
    Ok(())
}

/// File a report against another user's asset and escalate the asset
/// for manual attention. A report never rejects content by itself.
pub fn create_report(
    state: &AppState,
    reporter_id: Uuid,
    kind: AssetKind,
    asset_id: Uuid,
    reason: &str,
    description: Option<String>,
) -> AppResult<(MediaReport, Option<ModerationStatus>)> {
    if !REPORT_REASONS.contains(&reason) {
        return Err(AppError::new(
            ErrorCode::InvalidReportReason,
            format!("reason must be one of: {}", REPORT_REASONS.join(", ")),
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let mut asset = load_asset(&mut conn, kind, asset_id)?;

    if asset.owner_id() == reporter_id {
        return Err(AppError::new(
            ErrorCode::CannotReportSelf,
            "you cannot report your own content",
        ));
    }

    let existing: i64 = media_reports::table
        .filter(media_reports::reporter_id.eq(reporter_id))
        .filter(media_reports::asset_id.eq(asset_id))
        .count()
        .get_result(&mut conn)?;
    if existing > 0 {
        return Err(AppError::new(
            ErrorCode::DuplicateReport,
            "you already reported this content",
        ));
    }

    let new_report = NewMediaReport {
        reporter_id,
        owner_id: asset.owner_id(),
        asset_kind: kind.to_string(),
        asset_id,
        reason: reason.to_string(),
        description,
    };

    let report: MediaReport = diesel::insert_into(media_reports::table)
        .values(&new_report)
        .get_result(&mut conn)?;

    // Escalation is a no-op when the asset is already pending or
    // rejected; the report itself is still recorded.
    let escalated = transition(&mut asset, Transition::Escalate);
    if let Some(next) = escalated {
        store_asset_status(&mut conn, kind, asset_id, next)?;
    }

    tracing::info!(
        report_id = %report.id,
        asset_id = %asset_id,
        reporter_id = %reporter_id,
        escalated = escalated.is_some(),
        "media report created"
    );

    Ok((report, escalated))
}

pub fn list_reports(
    state: &AppState,
    params: &PaginationParams,
    status: Option<&str>,
) -> AppResult<Paginated<MediaReport>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let offset = params.offset() as i64;
    let limit = params.limit() as i64;

    let (items, total): (Vec<MediaReport>, i64) = if let Some(status) = status {
        let items = media_reports::table
            .filter(media_reports::status.eq(status))
            .order(media_reports::created_at.asc())
            .offset(offset)
            .limit(limit)
            .load(&mut conn)?;
        let total = media_reports::table
            .filter(media_reports::status.eq(status))
            .count()
            .get_result(&mut conn)?;
        (items, total)
    } else {
        let items = media_reports::table
            .order(media_reports::created_at.asc())
            .offset(offset)
            .limit(limit)
            .load(&mut conn)?;
        let total = media_reports::table.count().get_result(&mut conn)?;
        (items, total)
    };

    Ok(Paginated::new(items, total as u64, params))
}

pub struct ReviewOutcome {
    pub report: MediaReport,
    pub asset_status: Option<(ModerationStatus, ModerationStatus)>,
}

/// Apply a moderator's decision. Rejecting or re-approving an asset is
/// the manual override path and is the only way out of `rejected`.
pub fn review_report(
    state: &AppState,
    moderator_id: Uuid,
    report_id: Uuid,
    action: ReviewAction,
) -> AppResult<ReviewOutcome> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let report = media_reports::table
        .find(report_id)
        .first::<MediaReport>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))?;

    if report.status != "pending" {
        return Err(AppError::new(
            ErrorCode::ReportAlreadyReviewed,
            "this report has already been reviewed",
        ));
    }

    let kind: AssetKind = report
        .asset_kind
        .parse()
        .map_err(|e: String| AppError::internal(e))?;

    let asset_status = match action {
        ReviewAction::Dismiss => None,
        ReviewAction::ApproveAsset | ReviewAction::RejectAsset => {
            let target = if action == ReviewAction::RejectAsset {
                ModerationStatus::Rejected
            } else {
                ModerationStatus::Approved
            };
            let mut asset = load_asset(&mut conn, kind, report.asset_id)?;
            let previous = asset.status();
            match transition(&mut asset, Transition::ManualOverride(target)) {
                Some(next) => {
                    store_asset_status(&mut conn, kind, report.asset_id, next)?;
                    Some((previous, next))
                }
                None => None,
            }
        }
    };

    let report_status = if action == ReviewAction::Dismiss {
        "dismissed"
    } else {
        "reviewed"
    };

    let updated: MediaReport = diesel::update(media_reports::table.find(report_id))
        .set((
            media_reports::status.eq(report_status),
            media_reports::reviewed_by.eq(moderator_id),
            media_reports::reviewed_at.eq(Utc::now()),
        ))
        .get_result(&mut conn)?;

    tracing::info!(
        report_id = %report_id,
        moderator_id = %moderator_id,
        action = ?action,
        "report reviewed"
    );

    Ok(ReviewOutcome {
        report: updated,
        asset_status,
    })
}
