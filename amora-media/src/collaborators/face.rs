use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recognition model the comparison service is pinned to. Changing
/// this invalidates the calibrated similarity thresholds in the
/// verification engine.
const RECOGNITION_MODEL: &str = "Facenet512";

/// Result of comparing two face images.
#[derive(Debug, Clone, Copy)]
pub struct FaceComparison {
    /// Distance in [0,1]; lower means more similar.
    pub distance: f64,
    /// Whether a facial region was detected in the live capture.
    /// Used as the anti-spoofing signal.
    pub facial_region_detected: bool,
}

/// Errors from the comparison collaborator. The verification engine
/// maps all of these to a non-persisted `error` outcome.
#[derive(Debug, thiserror::Error)]
pub enum FaceMatchError {
    #[error("face comparison transport error: {0}")]
    Transport(String),
    #[error("face comparison returned status {0}")]
    Status(u16),
    #[error("face comparison returned a malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Compare a live capture against a reference image.
    async fn compare(&self, live: &[u8], reference: &[u8]) -> Result<FaceComparison, FaceMatchError>;
}

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    img1: &'a str,
    img2: &'a str,
    model_name: &'static str,
    anti_spoofing: bool,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    distance: f64,
    facial_areas: Option<serde_json::Value>,
}

/// HTTP implementation against the face analysis service.
pub struct FaceApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl FaceApiClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build face api http client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FaceMatcher for FaceApiClient {
    async fn compare(&self, live: &[u8], reference: &[u8]) -> Result<FaceComparison, FaceMatchError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let body = CompareRequest {
            img1: &engine.encode(live),
            img2: &engine.encode(reference),
            model_name: RECOGNITION_MODEL,
            anti_spoofing: true,
        };

        let resp = self.client
            .post(format!("{}/verify", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| FaceMatchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FaceMatchError::Status(resp.status().as_u16()));
        }

        let parsed: CompareResponse = resp
            .json()
            .await
            .map_err(|e| FaceMatchError::Malformed(e.to_string()))?;

        if !(0.0..=1.0).contains(&parsed.distance) {
            return Err(FaceMatchError::Malformed(format!(
                "distance {} outside [0,1]",
                parsed.distance
            )));
        }

        Ok(FaceComparison {
            distance: parsed.distance,
            facial_region_detected: parsed
                .facial_areas
                .map(|v| !v.is_null())
                .unwrap_or(false),
        })
    }
}
