use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::access::{AccessDecision, AssetFacts, PrivacyLevel};
use crate::models::{NewVoiceClip, VoiceClip};
use crate::moderation::status::{Moderatable, ModerationStatus};
use crate::schema::voice_clips;
use crate::AppState;

pub const MIN_DURATION_SECS: i32 = 3;
pub const MAX_DURATION_SECS: i32 = 30;
pub const MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct VoiceClipView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub duration_secs: i32,
    pub created_at: chrono::DateTime<Utc>,
}

impl VoiceClip {
    /// Voice intros have no privacy knob and no degraded rendition:
    /// they are public-or-nothing, still subject to blocks and
    /// moderation suppression.
    pub fn access_facts(&self) -> AssetFacts {
        AssetFacts {
            asset_id: self.id,
            owner_id: self.owner_id,
            privacy: PrivacyLevel::Public,
            status: self.status(),
            has_degraded_variant: false,
        }
    }
}

fn extension_for(content_type: &str) -> AppResult<&'static str> {
    match content_type {
        "audio/mpeg" | "audio/mp3" => Ok("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Ok("m4a"),
        "audio/ogg" => Ok("ogg"),
        "audio/webm" => Ok("webm"),
        "audio/wav" | "audio/x-wav" => Ok("wav"),
        _ => Err(AppError::new(
            ErrorCode::InvalidAudioFormat,
            "unsupported audio format, accepted: mp3, m4a, ogg, webm, wav",
        )),
    }
}

pub fn validate_bounds(duration_secs: i32, size_bytes: usize) -> AppResult<()> {
    if duration_secs < MIN_DURATION_SECS {
        return Err(AppError::new(
            ErrorCode::AudioTooShort,
            format!("voice intro must be at least {MIN_DURATION_SECS}s"),
        ));
    }
    if duration_secs > MAX_DURATION_SECS {
        return Err(AppError::new(
            ErrorCode::AudioTooLong,
            format!("voice intro must be at most {MAX_DURATION_SECS}s"),
        ));
    }
    if size_bytes > MAX_SIZE_BYTES {
        return Err(AppError::new(
            ErrorCode::PayloadTooLarge,
            "voice intro exceeds the 5 MiB limit",
        ));
    }
    if size_bytes == 0 {
        return Err(AppError::new(ErrorCode::InvalidAudioFormat, "empty audio payload"));
    }
    Ok(())
}

pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Upload or replace the caller's single voice intro.
///
/// Re-uploading identical audio is a no-op returning the existing
/// clip; different audio soft-deletes the previous clip so at most one
/// non-deleted clip exists per owner.
pub async fn upload_voice(
    state: &AppState,
    owner_id: Uuid,
    data: &[u8],
    content_type: &str,
    duration_secs: i32,
) -> AppResult<VoiceClip> {
    let ext = extension_for(content_type)?;
    validate_bounds(duration_secs, data.len())?;

    let hash = content_hash(data);

    let existing = {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
        voice_clips::table
            .filter(voice_clips::owner_id.eq(owner_id))
            .filter(voice_clips::is_deleted.eq(false))
            .first::<VoiceClip>(&mut conn)
            .optional()?
    };

    if let Some(ref clip) = existing {
        if clip.content_hash == hash {
            return Ok(clip.clone());
        }
    }

    let file_id = Uuid::now_v7();
    let storage_key = format!("voice/{owner_id}/{file_id}.{ext}");
    state
        .minio
        .upload(&storage_key, data.to_vec(), content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::VoiceUploadFailed, e))?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let clip = conn.transaction::<VoiceClip, AppError, _>(|conn| {
        if let Some(ref old) = existing {
            diesel::update(voice_clips::table.find(old.id))
                .set((
                    voice_clips::is_deleted.eq(true),
                    voice_clips::deleted_at.eq(Utc::now()),
                    voice_clips::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }

        let new_clip = NewVoiceClip {
            owner_id,
            storage_key: storage_key.clone(),
            duration_secs,
            size_bytes: data.len() as i64,
            moderation_status: ModerationStatus::AutoApproved.to_string(),
            content_hash: hash.clone(),
        };

        let clip = diesel::insert_into(voice_clips::table)
            .values(&new_clip)
            .get_result::<VoiceClip>(conn)?;

        Ok(clip)
    })?;

    tracing::info!(
        clip_id = %clip.id,
        owner_id = %owner_id,
        duration_secs = duration_secs,
        replaced = existing.is_some(),
        "voice intro uploaded"
    );

    Ok(clip)
}

pub fn get_own_clip(state: &AppState, owner_id: Uuid) -> AppResult<VoiceClip> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    voice_clips::table
        .filter(voice_clips::owner_id.eq(owner_id))
        .filter(voice_clips::is_deleted.eq(false))
        .first::<VoiceClip>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::VoiceClipNotFound, "no voice intro recorded"))
}

/// The voice intro of `target_id` as heard by `viewer`. Blocks and
/// moderation suppression apply through the same resolver as photos.
pub async fn get_clip_view(
    state: &AppState,
    viewer: Option<Uuid>,
    target_id: Uuid,
) -> AppResult<VoiceClipView> {
    let clip = {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
        voice_clips::table
            .filter(voice_clips::owner_id.eq(target_id))
            .filter(voice_clips::is_deleted.eq(false))
            .first::<VoiceClip>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::VoiceClipNotFound, "no voice intro recorded"))?
    };

    let resolution = state.resolver.resolve(viewer, &clip.access_facts()).await;
    match resolution.decision {
        AccessDecision::Original => {}
        _ => return Err(AppError::new(ErrorCode::VoiceClipNotFound, "no voice intro recorded")),
    }

    let url = state
        .minio
        .presigned_url(&clip.storage_key, state.config.presign_expiry_secs)
        .await
        .map_err(|e| AppError::internal(format!("presign failed: {e}")))?;

    Ok(VoiceClipView {
        id: clip.id,
        owner_id: clip.owner_id,
        url,
        duration_secs: clip.duration_secs,
        created_at: clip.created_at,
    })
}

pub fn delete_voice(state: &AppState, owner_id: Uuid) -> AppResult<()> {
    let clip = get_own_clip(state, owner_id)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    diesel::update(voice_clips::table.find(clip.id))
        .set((
            voice_clips::is_deleted.eq(true),
            voice_clips::deleted_at.eq(Utc::now()),
            voice_clips::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(clip_id = %clip.id, owner_id = %owner_id, "voice intro deleted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bounds_are_inclusive() {
        assert!(validate_bounds(MIN_DURATION_SECS, 1024).is_ok());
        assert!(validate_bounds(MAX_DURATION_SECS, 1024).is_ok());
        assert!(validate_bounds(MIN_DURATION_SECS - 1, 1024).is_err());
        assert!(validate_bounds(MAX_DURATION_SECS + 1, 1024).is_err());
    }

    #[test]
    fn oversized_and_empty_payloads_are_rejected() {
        assert!(validate_bounds(10, MAX_SIZE_BYTES + 1).is_err());
        assert!(validate_bounds(10, 0).is_err());
        assert!(validate_bounds(10, MAX_SIZE_BYTES).is_ok());
    }

    #[test]
    fn hash_is_stable_and_content_addressed() {
        let a = content_hash(b"same bytes");
        let b = content_hash(b"same bytes");
        let c = content_hash(b"different bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn unsupported_audio_format_is_rejected() {
        assert!(extension_for("video/mp4").is_err());
        assert_eq!(extension_for("audio/ogg").unwrap(), "ogg");
    }
}
