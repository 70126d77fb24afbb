use chrono::Utc;
use diesel::prelude::*;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;
use std::sync::Arc;
use uuid::Uuid;

use amora_shared::types::event::{payloads, routing_keys, Event};

use crate::events::publisher;
use crate::schema::{photos, voice_clips};
use crate::AppState;

/// Listen for auth.user.deleted events and soft-delete every media
/// asset of the deleted account. The retention sweep hard-purges the
/// stored objects later.
pub async fn listen_user_deleted(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state
        .rabbitmq
        .subscribe(
            "amora-media.auth.user.deleted",
            &[routing_keys::AUTH_USER_DELETED],
        )
        .await?;

    tracing::info!("listening for auth.user.deleted events");

    let mut consumer = consumer;
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::UserDeleted>>(&delivery.data) {
                    Ok(event) => {
                        let credential_id = event.data.credential_id;
                        tracing::info!(
                            credential_id = %credential_id,
                            "received user.deleted event"
                        );

                        match purge_user_media(&state, credential_id) {
                            Ok((photo_count, clip_count)) => {
                                publisher::publish_media_purged(
                                    &state.rabbitmq,
                                    credential_id,
                                    photo_count,
                                    clip_count,
                                )
                                .await;
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    credential_id = %credential_id,
                                    "failed to purge user media"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize user.deleted event");
                    }
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}

fn purge_user_media(state: &AppState, owner_id: Uuid) -> anyhow::Result<(usize, usize)> {
    let mut conn = state.db.get()?;

    let now = Utc::now();

    let photo_count = diesel::update(
        photos::table
            .filter(photos::owner_id.eq(owner_id))
            .filter(photos::is_deleted.eq(false)),
    )
    .set((
        photos::is_deleted.eq(true),
        photos::is_primary.eq(false),
        photos::deleted_at.eq(now),
        photos::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    let clip_count = diesel::update(
        voice_clips::table
            .filter(voice_clips::owner_id.eq(owner_id))
            .filter(voice_clips::is_deleted.eq(false)),
    )
    .set((
        voice_clips::is_deleted.eq(true),
        voice_clips::deleted_at.eq(now),
        voice_clips::updated_at.eq(now),
    ))
    .execute(&mut conn)?;

    tracing::info!(
        owner_id = %owner_id,
        photos = photo_count,
        voice_clips = clip_count,
        "user media soft-deleted"
    );

    Ok((photo_count, clip_count))
}
