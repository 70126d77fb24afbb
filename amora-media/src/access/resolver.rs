use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::collaborators::relationship::RelationshipFacts;
use crate::moderation::status::ModerationStatus;

/// Owner-chosen visibility policy for a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Private,
    MatchOnly,
    Vip,
}

impl PrivacyLevel {
    /// Non-public photos are served to non-matched viewers as a
    /// blurred variant, so one must exist for these levels.
    pub fn requires_degraded_variant(self) -> bool {
        !matches!(self, PrivacyLevel::Public)
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Private => "private",
            PrivacyLevel::MatchOnly => "match_only",
            PrivacyLevel::Vip => "vip",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(PrivacyLevel::Public),
            "private" => Ok(PrivacyLevel::Private),
            "match_only" => Ok(PrivacyLevel::MatchOnly),
            "vip" => Ok(PrivacyLevel::Vip),
            _ => Err(format!("unknown privacy level: {s}")),
        }
    }
}

/// What the viewer is allowed to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Original,
    Degraded,
    Denied,
}

/// Which rule in the ladder produced the decision. Logged and metered
/// so narrowing of the privacy model stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    Suppressed,
    NoIdentity,
    Owner,
    Blocked,
    PublicAsset,
    Matched,
    DegradedFallback,
    NoVariant,
}

impl AccessRule {
    fn as_str(self) -> &'static str {
        match self {
            AccessRule::Suppressed => "suppressed",
            AccessRule::NoIdentity => "no_identity",
            AccessRule::Owner => "owner",
            AccessRule::Blocked => "blocked",
            AccessRule::PublicAsset => "public",
            AccessRule::Matched => "matched",
            AccessRule::DegradedFallback => "degraded_fallback",
            AccessRule::NoVariant => "no_variant",
        }
    }
}

impl AccessDecision {
    fn as_str(self) -> &'static str {
        match self {
            AccessDecision::Original => "original",
            AccessDecision::Degraded => "degraded",
            AccessDecision::Denied => "denied",
        }
    }
}

/// The asset attributes the ladder needs, detached from any one entity
/// type so photos and voice clips share the resolver.
#[derive(Debug, Clone, Copy)]
pub struct AssetFacts {
    pub asset_id: Uuid,
    pub owner_id: Uuid,
    pub privacy: PrivacyLevel,
    pub status: ModerationStatus,
    pub has_degraded_variant: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub decision: AccessDecision,
    pub rule: AccessRule,
}

/// Decides, per (viewer, asset), whether to serve the original, the
/// degraded variant, or nothing. First matching rule wins. Every
/// uncertainty resolves toward less exposure: a missing identity
/// degrades, a failed relationship lookup denies.
pub struct AccessResolver {
    relationships: Arc<dyn RelationshipFacts>,
}

impl AccessResolver {
    pub fn new(relationships: Arc<dyn RelationshipFacts>) -> Self {
        Self { relationships }
    }

    pub async fn resolve(&self, viewer: Option<Uuid>, asset: &AssetFacts) -> Resolution {
        let resolution = self.evaluate(viewer, asset).await;
        record_decision(viewer, asset, resolution);
        resolution
    }

    /// Resolve a whole gallery belonging to one owner. The network
    /// facts are fetched once for the (viewer, owner) pair instead of
    /// per asset.
    pub async fn resolve_gallery(
        &self,
        viewer: Option<Uuid>,
        owner_id: Uuid,
        assets: &[AssetFacts],
    ) -> Vec<Resolution> {
        let stranger = viewer.filter(|v| *v != owner_id);

        let blocked = match stranger {
            Some(v) => {
                self.relationships.is_blocked(v, owner_id).await
                    || self.relationships.is_blocked(owner_id, v).await
            }
            None => false,
        };

        // The match lookup only matters when some asset is non-public
        // and the viewer isn't already blocked.
        let any_non_public = assets.iter().any(|a| a.privacy != PrivacyLevel::Public);
        let matched = match stranger {
            Some(v) if !blocked && any_non_public => {
                self.relationships.are_matched(v, owner_id).await
            }
            _ => false,
        };

        assets
            .iter()
            .map(|asset| {
                let resolution = ladder(viewer, asset, blocked, matched);
                record_decision(viewer, asset, resolution);
                resolution
            })
            .collect()
    }

    async fn evaluate(&self, viewer: Option<Uuid>, asset: &AssetFacts) -> Resolution {
        // Short-circuits that need no network facts.
        let viewer_id = match viewer {
            Some(v) if asset.status.is_servable() && v != asset.owner_id => v,
            _ => return ladder(viewer, asset, false, false),
        };

        // Blocks override every grant below, in both directions.
        let blocked = self.relationships.is_blocked(viewer_id, asset.owner_id).await
            || self.relationships.is_blocked(asset.owner_id, viewer_id).await;

        let matched = if !blocked && asset.privacy != PrivacyLevel::Public {
            self.relationships.are_matched(viewer_id, asset.owner_id).await
        } else {
            false
        };

        ladder(viewer, asset, blocked, matched)
    }
}

/// The decision ladder itself, pure over pre-fetched relationship
/// facts. First matching rule wins.
fn ladder(viewer: Option<Uuid>, asset: &AssetFacts, blocked: bool, matched: bool) -> Resolution {
    // Rejected content is fully suppressed, owner included.
    if !asset.status.is_servable() {
        return Resolution {
            decision: AccessDecision::Denied,
            rule: AccessRule::Suppressed,
        };
    }

    let viewer = match viewer {
        Some(id) => id,
        None => {
            let decision = if asset.has_degraded_variant {
                AccessDecision::Degraded
            } else {
                AccessDecision::Denied
            };
            return Resolution {
                decision,
                rule: AccessRule::NoIdentity,
            };
        }
    };

    if viewer == asset.owner_id {
        return Resolution {
            decision: AccessDecision::Original,
            rule: AccessRule::Owner,
        };
    }

    if blocked {
        return Resolution {
            decision: AccessDecision::Denied,
            rule: AccessRule::Blocked,
        };
    }

    if asset.privacy == PrivacyLevel::Public {
        return Resolution {
            decision: AccessDecision::Original,
            rule: AccessRule::PublicAsset,
        };
    }

    if matched {
        return Resolution {
            decision: AccessDecision::Original,
            rule: AccessRule::Matched,
        };
    }

    if asset.has_degraded_variant {
        Resolution {
            decision: AccessDecision::Degraded,
            rule: AccessRule::DegradedFallback,
        }
    } else {
        Resolution {
            decision: AccessDecision::Denied,
            rule: AccessRule::NoVariant,
        }
    }
}

fn record_decision(viewer: Option<Uuid>, asset: &AssetFacts, resolution: Resolution) {
    counter!(
        "media_access_decisions_total",
        "decision" => resolution.decision.as_str(),
        "rule" => resolution.rule.as_str(),
    )
    .increment(1);

    tracing::debug!(
        asset_id = %asset.asset_id,
        viewer = ?viewer,
        decision = resolution.decision.as_str(),
        rule = resolution.rule.as_str(),
        "access resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scripted relationship facts. Directional block pairs let tests
    /// exercise each direction of the two-way check; `unavailable`
    /// mirrors what the HTTP client reports after a collaborator
    /// failure (blocked=true, matched=false).
    #[derive(Default)]
    struct Facts {
        blocked_pairs: Vec<(Uuid, Uuid)>,
        matched: bool,
        unavailable: bool,
    }

    #[async_trait]
    impl RelationshipFacts for Facts {
        async fn is_blocked(&self, a: Uuid, b: Uuid) -> bool {
            if self.unavailable {
                return true;
            }
            self.blocked_pairs.contains(&(a, b))
        }

        async fn are_matched(&self, _a: Uuid, _b: Uuid) -> bool {
            if self.unavailable {
                return false;
            }
            self.matched
        }
    }

    fn resolver(facts: Facts) -> AccessResolver {
        AccessResolver::new(Arc::new(facts))
    }

    fn asset(privacy: PrivacyLevel, status: ModerationStatus, blurred: bool) -> AssetFacts {
        AssetFacts {
            asset_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            privacy,
            status,
            has_degraded_variant: blurred,
        }
    }

    #[tokio::test]
    async fn owner_sees_original_regardless_of_privacy() {
        let r = resolver(Facts::default());
        let a = asset(PrivacyLevel::MatchOnly, ModerationStatus::AutoApproved, true);
        let res = r.resolve(Some(a.owner_id), &a).await;
        assert_eq!(res.decision, AccessDecision::Original);
        assert_eq!(res.rule, AccessRule::Owner);
    }

    #[tokio::test]
    async fn anonymous_viewer_gets_degraded_never_original() {
        let r = resolver(Facts::default());
        let a = asset(PrivacyLevel::Private, ModerationStatus::Approved, true);
        let res = r.resolve(None, &a).await;
        assert_eq!(res.decision, AccessDecision::Degraded);

        let bare = asset(PrivacyLevel::Private, ModerationStatus::Approved, false);
        let res = r.resolve(None, &bare).await;
        assert_eq!(res.decision, AccessDecision::Denied);
    }

    #[tokio::test]
    async fn block_overrides_public() {
        let a = asset(PrivacyLevel::Public, ModerationStatus::Approved, false);
        let viewer = Uuid::new_v4();
        let r = resolver(Facts {
            blocked_pairs: vec![(viewer, a.owner_id)],
            ..Facts::default()
        });
        let res = r.resolve(Some(viewer), &a).await;
        assert_eq!(res.decision, AccessDecision::Denied);
        assert_eq!(res.rule, AccessRule::Blocked);
    }

    #[tokio::test]
    async fn reverse_block_also_denies() {
        let a = asset(PrivacyLevel::Public, ModerationStatus::Approved, false);
        let viewer = Uuid::new_v4();
        let r = resolver(Facts {
            blocked_pairs: vec![(a.owner_id, viewer)],
            ..Facts::default()
        });
        let res = r.resolve(Some(viewer), &a).await;
        assert_eq!(res.decision, AccessDecision::Denied);
    }

    #[tokio::test]
    async fn public_asset_served_to_strangers() {
        let r = resolver(Facts::default());
        let a = asset(PrivacyLevel::Public, ModerationStatus::AutoApproved, false);
        let res = r.resolve(Some(Uuid::new_v4()), &a).await;
        assert_eq!(res.decision, AccessDecision::Original);
        assert_eq!(res.rule, AccessRule::PublicAsset);
    }

    #[tokio::test]
    async fn matched_viewer_sees_original() {
        let r = resolver(Facts {
            matched: true,
            ..Facts::default()
        });
        let a = asset(PrivacyLevel::MatchOnly, ModerationStatus::Approved, true);
        let res = r.resolve(Some(Uuid::new_v4()), &a).await;
        assert_eq!(res.decision, AccessDecision::Original);
        assert_eq!(res.rule, AccessRule::Matched);
    }

    #[tokio::test]
    async fn unmatched_viewer_falls_back_to_degraded_then_denied() {
        let r = resolver(Facts::default());
        let blurred = asset(PrivacyLevel::MatchOnly, ModerationStatus::Approved, true);
        let res = r.resolve(Some(Uuid::new_v4()), &blurred).await;
        assert_eq!(res.decision, AccessDecision::Degraded);

        let bare = asset(PrivacyLevel::MatchOnly, ModerationStatus::Approved, false);
        let res = r.resolve(Some(Uuid::new_v4()), &bare).await;
        assert_eq!(res.decision, AccessDecision::Denied);
    }

    #[tokio::test]
    async fn rejected_asset_is_suppressed_even_for_owner() {
        let r = resolver(Facts::default());
        let a = asset(PrivacyLevel::Public, ModerationStatus::Rejected, true);
        let res = r.resolve(Some(a.owner_id), &a).await;
        assert_eq!(res.decision, AccessDecision::Denied);
        assert_eq!(res.rule, AccessRule::Suppressed);
    }

    #[tokio::test]
    async fn gallery_resolution_applies_the_same_ladder_per_asset() {
        let owner = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let r = resolver(Facts {
            matched: true,
            ..Facts::default()
        });

        let mut public = asset(PrivacyLevel::Public, ModerationStatus::Approved, false);
        public.owner_id = owner;
        let mut gated = asset(PrivacyLevel::MatchOnly, ModerationStatus::Approved, true);
        gated.owner_id = owner;
        let mut rejected = asset(PrivacyLevel::Public, ModerationStatus::Rejected, false);
        rejected.owner_id = owner;

        let resolutions = r
            .resolve_gallery(Some(viewer), owner, &[public, gated, rejected])
            .await;

        assert_eq!(resolutions[0].decision, AccessDecision::Original);
        assert_eq!(resolutions[1].decision, AccessDecision::Original);
        assert_eq!(resolutions[1].rule, AccessRule::Matched);
        assert_eq!(resolutions[2].decision, AccessDecision::Denied);
        assert_eq!(resolutions[2].rule, AccessRule::Suppressed);
    }

    #[tokio::test]
    async fn collaborator_outage_fails_secure() {
        // The HTTP client resolves an unreachable collaborator to
        // blocked=true / matched=false; the ladder must then deny.
        let r = resolver(Facts {
            unavailable: true,
            ..Facts::default()
        });
        let a = asset(PrivacyLevel::Public, ModerationStatus::Approved, true);
        let res = r.resolve(Some(Uuid::new_v4()), &a).await;
        assert_eq!(res.decision, AccessDecision::Denied);
        assert_eq!(res.rule, AccessRule::Blocked);
    }
}
