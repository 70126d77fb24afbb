use uuid::Uuid;

use amora_shared::clients::rabbitmq::RabbitMQClient;
use amora_shared::types::event::{payloads, routing_keys, Event};

use crate::models::AssetKind;
use crate::moderation::status::ModerationStatus;

const SOURCE: &str = "amora-media";

pub async fn publish_photo_uploaded(
    rabbitmq: &RabbitMQClient,
    photo_id: Uuid,
    owner_id: Uuid,
    privacy: &str,
    is_primary: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_PHOTO_UPLOADED,
        payloads::PhotoUploaded {
            photo_id,
            owner_id,
            privacy: privacy.to_string(),
            is_primary,
        },
    )
    .with_user(owner_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MEDIA_PHOTO_UPLOADED, &event).await {
        tracing::error!(error = %e, "failed to publish photo.uploaded event");
    }
}

pub async fn publish_voice_uploaded(
    rabbitmq: &RabbitMQClient,
    clip_id: Uuid,
    owner_id: Uuid,
    duration_secs: i32,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_VOICE_UPLOADED,
        payloads::VoiceUploaded {
            clip_id,
            owner_id,
            duration_secs,
        },
    )
    .with_user(owner_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MEDIA_VOICE_UPLOADED, &event).await {
        tracing::error!(error = %e, "failed to publish voice.uploaded event");
    }
}

pub async fn publish_voice_moderated(
    rabbitmq: &RabbitMQClient,
    clip_id: Uuid,
    owner_id: Uuid,
    old_status: ModerationStatus,
    new_status: ModerationStatus,
    violations: &[String],
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_VOICE_MODERATED,
        payloads::MediaModerated {
            asset_id: clip_id,
            owner_id,
            asset_kind: AssetKind::Voice.to_string(),
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
            violations: violations.to_vec(),
        },
    )
    .with_user(owner_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MEDIA_VOICE_MODERATED, &event).await {
        tracing::error!(error = %e, "failed to publish voice.moderated event");
    }
}

pub async fn publish_asset_moderated(
    rabbitmq: &RabbitMQClient,
    kind: AssetKind,
    asset_id: Uuid,
    owner_id: Uuid,
    old_status: ModerationStatus,
    new_status: ModerationStatus,
) {
    let routing_key = match kind {
        AssetKind::Photo => routing_keys::MEDIA_PHOTO_MODERATED,
        AssetKind::Voice => routing_keys::MEDIA_VOICE_MODERATED,
    };

    let event = Event::new(
        SOURCE,
        routing_key,
        payloads::MediaModerated {
            asset_id,
            owner_id,
            asset_kind: kind.to_string(),
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
            violations: Vec::new(),
        },
    )
    .with_user(owner_id);

    if let Err(e) = rabbitmq.publish(routing_key, &event).await {
        tracing::error!(error = %e, "failed to publish asset.moderated event");
    }
}

pub async fn publish_report_created(
    rabbitmq: &RabbitMQClient,
    report_id: Uuid,
    reporter_id: Uuid,
    owner_id: Uuid,
    asset_kind: &str,
    asset_id: Uuid,
    reason: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_REPORT_CREATED,
        payloads::ReportCreated {
            report_id,
            reporter_id,
            owner_id,
            asset_kind: asset_kind.to_string(),
            asset_id,
            reason: reason.to_string(),
        },
    )
    .with_user(reporter_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MEDIA_REPORT_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish report.created event");
    }
}

pub async fn publish_verification_completed(
    rabbitmq: &RabbitMQClient,
    user_id: Uuid,
    outcome: &str,
    similarity: f64,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_VERIFICATION_COMPLETED,
        payloads::VerificationCompleted {
            user_id,
            outcome: outcome.to_string(),
            similarity,
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MEDIA_VERIFICATION_COMPLETED, &event)
        .await
    {
        tracing::error!(error = %e, "failed to publish verification.completed event");
    }
}

pub async fn publish_media_purged(
    rabbitmq: &RabbitMQClient,
    owner_id: Uuid,
    photos: usize,
    voice_clips: usize,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MEDIA_PURGED,
        payloads::MediaPurged {
            owner_id,
            photos,
            voice_clips,
        },
    )
    .with_user(owner_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MEDIA_PURGED, &event).await {
        tracing::error!(error = %e, "failed to publish media.purged event");
    }
}
