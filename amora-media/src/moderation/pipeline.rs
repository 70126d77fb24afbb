use diesel::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::collaborators::speech::SpeechToText;
use crate::collaborators::transcode;
use crate::events::publisher;
use crate::models::VoiceClip;
use crate::moderation::scanner::RuleSet;
use crate::moderation::status::{Moderatable, ModerationStatus};
use crate::schema::voice_clips;
use crate::AppState;

/// Transcript stored when the speech collaborator cannot produce one.
/// The clip is approved rather than left unmoderated forever.
pub const TRANSCRIPT_UNAVAILABLE: &str = "[transcription unavailable]";

/// Classify a transcript: any violation rejects, a clean transcript
/// approves. The tag list accompanies the moderation event.
pub fn classify_transcript(rules: &RuleSet, transcript: &str) -> (ModerationStatus, Vec<String>) {
    let violations = rules.scan(transcript);
    let status = if violations.is_empty() {
        ModerationStatus::Approved
    } else {
        ModerationStatus::Rejected
    };
    (status, violations)
}

/// Long-lived polling worker. One instance per process; the pipeline
/// is idempotent per clip, so concurrent instances waste work but stay
/// correct. The speech client is constructed once at startup and owned
/// here for the life of the process.
pub struct ModerationWorker {
    state: Arc<AppState>,
    speech: Arc<dyn SpeechToText>,
    rules: RuleSet,
    shutdown: watch::Receiver<bool>,
}

impl ModerationWorker {
    pub fn new(
        state: Arc<AppState>,
        speech: Arc<dyn SpeechToText>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            speech,
            rules: RuleSet::default(),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let interval = Duration::from_secs(self.state.config.scan_interval_secs);
        tracing::info!(
            interval_secs = interval.as_secs(),
            batch_size = self.state.config.scan_batch_size,
            "voice moderation worker started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = self.shutdown.changed() => {
                    // A dropped sender means the process is going away.
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!("voice moderation worker shutting down");
                        return;
                    }
                }
            }

            let batch = match self.load_batch() {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load moderation batch");
                    continue;
                }
            };

            for clip in batch {
                // Check shutdown between items so an in-flight batch
                // never delays process exit.
                if *self.shutdown.borrow() {
                    tracing::info!("voice moderation worker shutting down mid-batch");
                    return;
                }

                if let Err(e) = self.process_clip(&clip).await {
                    tracing::error!(error = %e, clip_id = %clip.id, "clip moderation failed");
                }
            }
        }
    }

    fn load_batch(&self) -> anyhow::Result<Vec<VoiceClip>> {
        let mut conn = self.state.db.get()?;

        let batch = voice_clips::table
            .filter(voice_clips::moderation_status.eq(ModerationStatus::AutoApproved.to_string()))
            .filter(voice_clips::is_deleted.eq(false))
            .order(voice_clips::created_at.asc())
            .limit(self.state.config.scan_batch_size)
            .load::<VoiceClip>(&mut conn)?;

        Ok(batch)
    }

    async fn process_clip(&self, clip: &VoiceClip) -> anyhow::Result<()> {
        // Storage failure is transient infrastructure trouble, not a
        // transcription failure: leave the clip queued for the next
        // pass instead of approving it blind.
        let audio = match self.state.minio.get(&clip.storage_key).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(clip_id = %clip.id, error = %e, "audio fetch failed, will retry");
                return Ok(());
            }
        };

        let transcript = match self.transcribe(&audio).await {
            Some(text) => text,
            None => {
                // Non-fatal fallback: sentinel transcript, approved.
                self.store_result(clip, TRANSCRIPT_UNAVAILABLE, ModerationStatus::Approved, &[])?;
                publisher::publish_voice_moderated(
                    &self.state.rabbitmq,
                    clip.id,
                    clip.owner_id,
                    clip.status(),
                    ModerationStatus::Approved,
                    &[],
                )
                .await;
                return Ok(());
            }
        };

        let (status, violations) = classify_transcript(&self.rules, &transcript);
        self.store_result(clip, &transcript, status, &violations)?;

        publisher::publish_voice_moderated(
            &self.state.rabbitmq,
            clip.id,
            clip.owner_id,
            clip.status(),
            status,
            &violations,
        )
        .await;

        tracing::info!(
            clip_id = %clip.id,
            status = %status,
            violations = violations.len(),
            "voice clip moderated"
        );

        Ok(())
    }

    /// Transcode then transcribe. Any failure along the way reports
    /// `None`; the scratch WAV only ever exists inside the transcoder.
    async fn transcribe(&self, audio: &[u8]) -> Option<String> {
        let wav = match transcode::to_mono_wav(audio).await {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "transcode failed");
                return None;
            }
        };

        match self.speech.transcribe(wav).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                None
            }
        }
    }

    fn store_result(
        &self,
        clip: &VoiceClip,
        transcript: &str,
        status: ModerationStatus,
        violations: &[String],
    ) -> anyhow::Result<()> {
        let mut conn = self.state.db.get()?;

        // Guarded writes keep the pipeline idempotent and preserve a
        // concurrent report escalation or moderator decision:
        // approvals only land on clips still in auto_approved,
        // rejections on anything not already rejected.
        let updated = match status {
            ModerationStatus::Rejected => diesel::update(
                voice_clips::table
                    .find(clip.id)
                    .filter(voice_clips::moderation_status.ne(ModerationStatus::Rejected.to_string())),
            )
            .set((
                voice_clips::moderation_status.eq(status.to_string()),
                voice_clips::transcript.eq(transcript),
                voice_clips::updated_at.eq(chrono::Utc::now()),
            ))
            .execute(&mut conn)?,
            _ => diesel::update(
                voice_clips::table
                    .find(clip.id)
                    .filter(voice_clips::moderation_status.eq(ModerationStatus::AutoApproved.to_string())),
            )
            .set((
                voice_clips::moderation_status.eq(status.to_string()),
                voice_clips::transcript.eq(transcript),
                voice_clips::updated_at.eq(chrono::Utc::now()),
            ))
            .execute(&mut conn)?,
        };

        if updated == 0 {
            tracing::debug!(clip_id = %clip.id, "clip state moved during scan, write skipped");
        } else if !violations.is_empty() {
            tracing::info!(clip_id = %clip.id, ?violations, "voice clip rejected");
        }

        Ok(())
    }
}

/// Spawn the worker as a background task. Lifecycle is driven through
/// the shutdown channel; the handle is only awaited on process exit.
pub fn spawn_worker(
    state: Arc<AppState>,
    speech: Arc<dyn SpeechToText>,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        ModerationWorker::new(state, speech, shutdown).run().await;
    })
}

/// Placeholder used when the deployment has no transcription backend
/// configured; everything falls back to the sentinel path.
pub struct DisabledSpeech;

#[async_trait::async_trait]
impl SpeechToText for DisabledSpeech {
    async fn transcribe(
        &self,
        _wav: Vec<u8>,
    ) -> Result<String, crate::collaborators::speech::SpeechError> {
        Err(crate::collaborators::speech::SpeechError::Transport(
            "transcription disabled".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_transcript_approves() {
        let rules = RuleSet::default();
        let (status, violations) = classify_transcript(&rules, "hi, I love hiking and dogs");
        assert_eq!(status, ModerationStatus::Approved);
        assert!(violations.is_empty());
    }

    #[test]
    fn violating_transcript_rejects_with_tags() {
        let rules = RuleSet::default();
        let (status, violations) =
            classify_transcript(&rules, "text me at john@gmail.com for nudes");
        assert_eq!(status, ModerationStatus::Rejected);
        assert!(violations.contains(&"contact_info:email".to_string()));
        assert!(violations.contains(&"explicit:nudes".to_string()));
    }

    #[test]
    fn empty_transcript_approves() {
        let rules = RuleSet::default();
        let (status, violations) = classify_transcript(&rules, "");
        assert_eq!(status, ModerationStatus::Approved);
        assert!(violations.is_empty());
    }

    #[test]
    fn sentinel_transcript_does_not_trip_the_scanner() {
        let rules = RuleSet::default();
        let (status, _) = classify_transcript(&rules, TRANSCRIPT_UNAVAILABLE);
        assert_eq!(status, ModerationStatus::Approved);
    }
}
