use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `amora.{domain}.{entity}.{action}`
/// Example: `amora.media.photo.uploaded`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events (consumed)
    pub const AUTH_USER_DELETED: &str = "amora.auth.user.deleted";
    pub const AUTH_USER_BANNED: &str = "amora.auth.user.banned";

    // Media events (published by amora-media)
    pub const MEDIA_PHOTO_UPLOADED: &str = "amora.media.photo.uploaded";
    pub const MEDIA_PHOTO_MODERATED: &str = "amora.media.photo.moderated";
    pub const MEDIA_VOICE_UPLOADED: &str = "amora.media.voice.uploaded";
    pub const MEDIA_VOICE_MODERATED: &str = "amora.media.voice.moderated";
    pub const MEDIA_REPORT_CREATED: &str = "amora.media.report.created";
    pub const MEDIA_VERIFICATION_COMPLETED: &str = "amora.media.verification.completed";
    pub const MEDIA_PURGED: &str = "amora.media.media.purged";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserDeleted {
        pub credential_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserBanned {
        pub credential_id: Uuid,
        pub is_banned: bool,
        pub ban_until: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PhotoUploaded {
        pub photo_id: Uuid,
        pub owner_id: Uuid,
        pub privacy: String,
        pub is_primary: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MediaModerated {
        pub asset_id: Uuid,
        pub owner_id: Uuid,
        pub asset_kind: String,
        pub old_status: String,
        pub new_status: String,
        pub violations: Vec<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VoiceUploaded {
        pub clip_id: Uuid,
        pub owner_id: Uuid,
        pub duration_secs: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub reporter_id: Uuid,
        pub owner_id: Uuid,
        pub asset_kind: String,
        pub asset_id: Uuid,
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VerificationCompleted {
        pub user_id: Uuid,
        pub outcome: String,
        pub similarity: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MediaPurged {
        pub owner_id: Uuid,
        pub photos: usize,
        pub voice_clips: usize,
    }
}
