use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::access::{AccessDecision, AssetFacts, PrivacyLevel};
use crate::models::{NewPhoto, Photo, UpdatePhoto};
use crate::moderation::status::{Moderatable, ModerationStatus};
use crate::schema::photos;
use crate::services::processing;
use crate::AppState;

const MAX_PHOTOS_PER_USER: i64 = 9;

/// A photo as served to a viewer: the URL points at whichever variant
/// the access resolver granted. The raw storage keys never leave the
/// service.
#[derive(Debug, Serialize)]
pub struct PhotoView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub privacy: String,
    pub display_order: i32,
    pub is_primary: bool,
    pub quality_score: i32,
    pub access: &'static str,
}

impl Photo {
    pub fn privacy_level(&self) -> PrivacyLevel {
        // Stored values come from PrivacyLevel::to_string; unknown
        // values read back as the most restrictive level.
        self.privacy.parse().unwrap_or(PrivacyLevel::Private)
    }

    pub fn access_facts(&self) -> AssetFacts {
        AssetFacts {
            asset_id: self.id,
            owner_id: self.owner_id,
            privacy: self.privacy_level(),
            status: self.status(),
            has_degraded_variant: self.blur_storage_key.is_some(),
        }
    }
}

fn extension_for(content_type: &str) -> AppResult<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        _ => Err(AppError::new(
            ErrorCode::InvalidImageFormat,
            "unsupported image format, accepted: jpeg, png, webp",
        )),
    }
}

pub async fn upload_photo(
    state: &AppState,
    owner_id: Uuid,
    data: &[u8],
    content_type: &str,
    privacy: PrivacyLevel,
) -> AppResult<Photo> {
    let ext = extension_for(content_type)?;
    let processed = processing::process_upload(data)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let existing: i64 = photos::table
        .filter(photos::owner_id.eq(owner_id))
        .filter(photos::is_deleted.eq(false))
        .count()
        .get_result(&mut conn)?;
    if existing >= MAX_PHOTOS_PER_USER {
        return Err(AppError::new(
            ErrorCode::PhotoUploadFailed,
            format!("photo limit reached ({MAX_PHOTOS_PER_USER})"),
        ));
    }

    let file_id = Uuid::now_v7();
    let storage_key = format!("photos/{owner_id}/{file_id}.{ext}");
    state
        .minio
        .upload(&storage_key, data.to_vec(), content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e))?;

    let blur_storage_key = if privacy.requires_degraded_variant() {
        let blurred = processing::blur_variant(&processed.image)?;
        let key = format!("photos/{owner_id}/{file_id}_blur.jpg");
        state
            .minio
            .upload(&key, blurred, "image/jpeg")
            .await
            .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e))?;
        Some(key)
    } else {
        None
    };

    let next_order: i32 = photos::table
        .filter(photos::owner_id.eq(owner_id))
        .filter(photos::is_deleted.eq(false))
        .select(diesel::dsl::max(photos::display_order))
        .first::<Option<i32>>(&mut conn)?
        .unwrap_or(0)
        + 1;

    // First non-deleted photo becomes primary automatically.
    let is_primary = existing == 0;

    let new_photo = NewPhoto {
        owner_id,
        storage_key,
        blur_storage_key,
        width: processed.width,
        height: processed.height,
        privacy: privacy.to_string(),
        quality_score: processed.quality_score,
        moderation_status: ModerationStatus::AutoApproved.to_string(),
        display_order: next_order,
        is_primary,
    };

    let photo: Photo = diesel::insert_into(photos::table)
        .values(&new_photo)
        .get_result(&mut conn)?;

    tracing::info!(
        photo_id = %photo.id,
        owner_id = %owner_id,
        privacy = %photo.privacy,
        "photo uploaded"
    );

    Ok(photo)
}

/// The owner's own gallery, rejected photos included so the owner can
/// see what was taken down. Direct views still suppress rejected.
pub fn list_own_photos(state: &AppState, owner_id: Uuid) -> AppResult<Vec<Photo>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let items = photos::table
        .filter(photos::owner_id.eq(owner_id))
        .filter(photos::is_deleted.eq(false))
        .order(photos::display_order.asc())
        .load::<Photo>(&mut conn)?;

    Ok(items)
}

/// Photos of `target_id` as seen by `viewer`. Each photo goes through
/// the access resolver; denied photos are dropped from the listing.
pub async fn list_visible_photos(
    state: &AppState,
    viewer: Option<Uuid>,
    target_id: Uuid,
) -> AppResult<Vec<PhotoView>> {
    let candidates = {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
        photos::table
            .filter(photos::owner_id.eq(target_id))
            .filter(photos::is_deleted.eq(false))
            .filter(photos::moderation_status.ne(ModerationStatus::Rejected.to_string()))
            .order(photos::display_order.asc())
            .load::<Photo>(&mut conn)?
    };

    let facts: Vec<_> = candidates.iter().map(|p| p.access_facts()).collect();
    let resolutions = state.resolver.resolve_gallery(viewer, target_id, &facts).await;

    let mut views = Vec::with_capacity(candidates.len());
    for (photo, resolution) in candidates.iter().zip(resolutions) {
        if let Some(view) = presign_view(state, photo, resolution.decision).await? {
            views.push(view);
        }
    }

    Ok(views)
}

/// Resolve a single photo for a viewer. Suppressed and denied photos
/// surface as not-found so existence is not leaked.
pub async fn get_photo_view(
    state: &AppState,
    viewer: Option<Uuid>,
    photo_id: Uuid,
) -> AppResult<PhotoView> {
    let photo = {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
        photos::table
            .find(photo_id)
            .filter(photos::is_deleted.eq(false))
            .first::<Photo>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::PhotoNotFound, "photo not found"))?
    };

    view_for(state, viewer, &photo)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoNotFound, "photo not found"))
}

async fn view_for(
    state: &AppState,
    viewer: Option<Uuid>,
    photo: &Photo,
) -> AppResult<Option<PhotoView>> {
    let resolution = state.resolver.resolve(viewer, &photo.access_facts()).await;
    presign_view(state, photo, resolution.decision).await
}

async fn presign_view(
    state: &AppState,
    photo: &Photo,
    decision: AccessDecision,
) -> AppResult<Option<PhotoView>> {
    let (key, access) = match decision {
        AccessDecision::Original => (photo.storage_key.as_str(), "original"),
        AccessDecision::Degraded => match photo.blur_storage_key.as_deref() {
            Some(key) => (key, "degraded"),
            None => return Ok(None),
        },
        AccessDecision::Denied => return Ok(None),
    };

    let url = state
        .minio
        .presigned_url(key, state.config.presign_expiry_secs)
        .await
        .map_err(|e| AppError::internal(format!("presign failed: {e}")))?;

    Ok(Some(PhotoView {
        id: photo.id,
        owner_id: photo.owner_id,
        url,
        width: photo.width,
        height: photo.height,
        privacy: photo.privacy.clone(),
        display_order: photo.display_order,
        is_primary: photo.is_primary,
        quality_score: photo.quality_score,
        access,
    }))
}

pub async fn update_photo(
    state: &AppState,
    owner_id: Uuid,
    photo_id: Uuid,
    privacy: Option<PrivacyLevel>,
    display_order: Option<i32>,
) -> AppResult<Photo> {
    if let Some(order) = display_order {
        if order < 1 {
            return Err(AppError::Validation("display_order must be positive".into()));
        }
    }

    let photo = owned_photo(state, owner_id, photo_id)?;

    // Tightening privacy on a photo uploaded as public means no blur
    // variant exists yet; create one from the stored original.
    let mut new_blur_key: Option<Option<String>> = None;
    if let Some(level) = privacy {
        if level.requires_degraded_variant() && photo.blur_storage_key.is_none() {
            let original = state
                .minio
                .get(&photo.storage_key)
                .await
                .map_err(|e| AppError::internal(format!("fetch original failed: {e}")))?;
            let processed = processing::process_upload(&original)?;
            let blurred = processing::blur_variant(&processed.image)?;
            let key = format!("photos/{owner_id}/{}_blur.jpg", photo.id);
            state
                .minio
                .upload(&key, blurred, "image/jpeg")
                .await
                .map_err(|e| AppError::internal(format!("blur upload failed: {e}")))?;
            new_blur_key = Some(Some(key));
        }
    }

    let changes = UpdatePhoto {
        privacy: privacy.map(|p| p.to_string()),
        blur_storage_key: new_blur_key,
        display_order,
        updated_at: Some(Utc::now()),
    };

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    let updated: Photo = diesel::update(photos::table.find(photo_id))
        .set(&changes)
        .get_result(&mut conn)?;

    Ok(updated)
}

/// Rows whose `is_primary` flag must flip so that exactly `new_primary`
/// carries it afterwards. Works from whatever state is actually stored,
/// so a corrupted multi-primary gallery heals on the next reassignment.
pub fn primary_reassignments(
    gallery: &[(Uuid, bool)],
    new_primary: Uuid,
) -> Vec<(Uuid, bool)> {
    let mut changes = Vec::new();
    for &(id, is_primary) in gallery {
        let should_be = id == new_primary;
        if is_primary != should_be {
            changes.push((id, should_be));
        }
    }
    changes
}

pub fn set_primary(state: &AppState, owner_id: Uuid, photo_id: Uuid) -> AppResult<Photo> {
    let photo = owned_photo(state, owner_id, photo_id)?;
    if photo.status() == ModerationStatus::Rejected {
        return Err(AppError::new(
            ErrorCode::PhotoNotFound,
            "photo not found",
        ));
    }

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    conn.transaction::<_, AppError, _>(|conn| {
        let gallery: Vec<(Uuid, bool)> = photos::table
            .filter(photos::owner_id.eq(owner_id))
            .filter(photos::is_deleted.eq(false))
            .select((photos::id, photos::is_primary))
            .load(conn)?;

        for (id, flag) in primary_reassignments(&gallery, photo_id) {
            diesel::update(photos::table.find(id))
                .set((
                    photos::is_primary.eq(flag),
                    photos::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
        }

        Ok(())
    })?;

    let updated = photos::table.find(photo_id).first::<Photo>(&mut conn)?;

    tracing::info!(photo_id = %photo_id, owner_id = %owner_id, "primary photo reassigned");

    Ok(updated)
}

pub fn soft_delete(state: &AppState, owner_id: Uuid, photo_id: Uuid) -> AppResult<()> {
    let _ = owned_photo(state, owner_id, photo_id)?;

    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
    diesel::update(photos::table.find(photo_id))
        .set((
            photos::is_deleted.eq(true),
            photos::is_primary.eq(false),
            photos::deleted_at.eq(Utc::now()),
            photos::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(photo_id = %photo_id, owner_id = %owner_id, "photo soft-deleted");

    Ok(())
}

fn owned_photo(state: &AppState, owner_id: Uuid, photo_id: Uuid) -> AppResult<Photo> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    photos::table
        .find(photo_id)
        .filter(photos::owner_id.eq(owner_id))
        .filter(photos::is_deleted.eq(false))
        .first::<Photo>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoNotFound, "photo not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassignment_moves_the_flag() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let changes = primary_reassignments(&[(a, true), (b, false)], b);
        assert_eq!(changes, vec![(a, false), (b, true)]);
    }

    #[test]
    fn reassignment_heals_corrupted_multi_primary_state() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        // Seeded corruption: two photos already claim primary.
        let changes = primary_reassignments(&[(a, true), (b, true), (c, false)], c);
        assert_eq!(changes, vec![(a, false), (b, false), (c, true)]);

        // Exactly one primary remains after applying the changes.
        let mut state = vec![(a, true), (b, true), (c, false)];
        for (id, flag) in changes {
            state.iter_mut().find(|(i, _)| *i == id).unwrap().1 = flag;
        }
        assert_eq!(state.iter().filter(|(_, p)| *p).count(), 1);
    }

    #[test]
    fn reassignment_is_noop_when_already_consistent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(primary_reassignments(&[(a, true), (b, false)], a).is_empty());
    }

    #[test]
    fn unsupported_content_type_is_rejected() {
        assert!(extension_for("image/gif").is_err());
        assert!(extension_for("application/pdf").is_err());
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
    }
}
