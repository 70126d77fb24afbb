use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::moderation::status::{Moderatable, ModerationStatus};
use crate::schema::{media_reports, photos, verification_attempts, voice_clips};

// --- Photo ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = photos)]
pub struct Photo {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip_serializing)]
    pub storage_key: String,
    #[serde(skip_serializing)]
    pub blur_storage_key: Option<String>,
    pub width: i32,
    pub height: i32,
    pub privacy: String,
    pub quality_score: i32,
    pub moderation_status: String,
    pub display_order: i32,
    pub is_primary: bool,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto {
    pub owner_id: Uuid,
    pub storage_key: String,
    pub blur_storage_key: Option<String>,
    pub width: i32,
    pub height: i32,
    pub privacy: String,
    pub quality_score: i32,
    pub moderation_status: String,
    pub display_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = photos)]
pub struct UpdatePhoto {
    pub privacy: Option<String>,
    pub blur_storage_key: Option<Option<String>>,
    pub display_order: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Moderatable for Photo {
    fn status(&self) -> ModerationStatus {
        ModerationStatus::parse_or_default(&self.moderation_status)
    }

    fn set_status(&mut self, status: ModerationStatus) {
        self.moderation_status = status.to_string();
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

// --- VoiceClip ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = voice_clips)]
pub struct VoiceClip {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub duration_secs: i32,
    pub size_bytes: i64,
    pub moderation_status: String,
    #[serde(skip_serializing)]
    pub transcript: Option<String>,
    #[serde(skip_serializing)]
    pub content_hash: String,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = voice_clips)]
pub struct NewVoiceClip {
    pub owner_id: Uuid,
    pub storage_key: String,
    pub duration_secs: i32,
    pub size_bytes: i64,
    pub moderation_status: String,
    pub content_hash: String,
}

impl Moderatable for VoiceClip {
    fn status(&self) -> ModerationStatus {
        ModerationStatus::parse_or_default(&self.moderation_status)
    }

    fn set_status(&mut self, status: ModerationStatus) {
        self.moderation_status = status.to_string();
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

// --- MediaReport ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = media_reports)]
pub struct MediaReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub owner_id: Uuid,
    pub asset_kind: String,
    pub asset_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = media_reports)]
pub struct NewMediaReport {
    pub reporter_id: Uuid,
    pub owner_id: Uuid,
    pub asset_kind: String,
    pub asset_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
}

// --- VerificationAttempt ---

// Attempt rows are append-only. There is no AsChangeset struct on
// purpose: an attempt is never updated after insertion.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = verification_attempts)]
pub struct VerificationAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_id: Uuid,
    pub similarity: f64,
    pub outcome: String,
    pub rejection_reason: Option<String>,
    pub spoof_check_passed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = verification_attempts)]
pub struct NewVerificationAttempt {
    pub user_id: Uuid,
    pub photo_id: Uuid,
    pub similarity: f64,
    pub outcome: String,
    pub rejection_reason: Option<String>,
    pub spoof_check_passed: bool,
}

// --- Asset kind discriminator for reports ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Photo,
    Voice,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Photo => write!(f, "photo"),
            AssetKind::Voice => write!(f, "voice"),
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(AssetKind::Photo),
            "voice" => Ok(AssetKind::Voice),
            _ => Err(format!("unknown asset kind: {s}")),
        }
    }
}
