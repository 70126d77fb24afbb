use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Relationship facts the access resolver consumes. Answers come from
/// the social service over the network; implementations must resolve
/// uncertainty to the SECURE value, never surface an error.
#[async_trait]
pub trait RelationshipFacts: Send + Sync {
    /// True if `a` has blocked `b`. Unknown/unreachable => treated as
    /// blocked by the resolver, so implementations return `true` on
    /// failure.
    async fn is_blocked(&self, a: Uuid, b: Uuid) -> bool;

    /// True if the two users have a mutual match. Unknown/unreachable
    /// => `false` (no access granted on uncertainty).
    async fn are_matched(&self, a: Uuid, b: Uuid) -> bool;
}

/// HTTP implementation against the social service's internal endpoints.
pub struct SocialServiceClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct FactResponse {
    result: bool,
}

impl SocialServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .expect("failed to build social service http client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn query_fact(&self, path: &str, a: Uuid, b: Uuid) -> Option<bool> {
        let url = format!("{}{path}?a={a}&b={b}", self.base_url);
        let resp = self.client.get(&url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.json::<FactResponse>().await.ok().map(|r| r.result)
    }
}

#[async_trait]
impl RelationshipFacts for SocialServiceClient {
    async fn is_blocked(&self, a: Uuid, b: Uuid) -> bool {
        match self.query_fact("/internal/blocks/check", a, b).await {
            Some(blocked) => blocked,
            None => {
                tracing::warn!(a = %a, b = %b, "block check unavailable, failing secure");
                true
            }
        }
    }

    async fn are_matched(&self, a: Uuid, b: Uuid) -> bool {
        match self.query_fact("/internal/matches/check", a, b).await {
            Some(matched) => matched,
            None => {
                tracing::warn!(a = %a, b = %b, "match check unavailable, failing secure");
                false
            }
        }
    }
}
