use async_trait::async_trait;
use std::time::Duration;

/// Errors from the transcription collaborator. The pipeline treats all
/// of these as non-fatal: the clip falls back to the sentinel
/// transcript instead of staying unmoderated forever.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("transcription transport error: {0}")]
    Transport(String),
    #[error("transcription service returned status {0}: {1}")]
    Status(u16, String),
    #[error("transcription returned a malformed response: {0}")]
    Malformed(String),
}

/// Speech-to-text over a 16 kHz mono WAV payload.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, SpeechError>;
}

/// OpenAI-compatible transcription endpoint (`/audio/transcriptions`).
/// Constructed once at startup and owned by the moderation pipeline.
pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl TranscriptionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build transcription http client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechToText for TranscriptionClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, SpeechError> {
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::Malformed(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let resp = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Status(status, body));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SpeechError::Malformed(e.to_string()))?;

        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| SpeechError::Malformed("missing text field".to_string()))?
            .trim()
            .to_string();

        Ok(text)
    }
}
