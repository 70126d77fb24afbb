use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle stage of a moderatable asset.
///
/// `AutoApproved` is the optimistic default: an asset is servable the
/// moment it is created, before any classification has run. The async
/// pipeline (or a human reviewer) later moves it to `Approved` or
/// `Rejected`. `PendingReview` is the report-escalation state; it is
/// still servable. Only `Rejected` removes an asset from read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    AutoApproved,
    Approved,
    PendingReview,
    Rejected,
}

impl ModerationStatus {
    /// Whether the asset may be served to viewers other than moderators.
    pub fn is_servable(self) -> bool {
        !matches!(self, ModerationStatus::Rejected)
    }

    /// `Rejected` is terminal for automated transitions. Only a manual
    /// moderator override may leave it.
    pub fn is_terminal(self) -> bool {
        matches!(self, ModerationStatus::Rejected)
    }

    /// Parse a stored status string, falling back to the most
    /// restrictive servable state for unknown values.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or(ModerationStatus::PendingReview)
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModerationStatus::AutoApproved => "auto_approved",
            ModerationStatus::Approved => "approved",
            ModerationStatus::PendingReview => "pending_review",
            ModerationStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_approved" => Ok(ModerationStatus::AutoApproved),
            "approved" => Ok(ModerationStatus::Approved),
            "pending_review" => Ok(ModerationStatus::PendingReview),
            "rejected" => Ok(ModerationStatus::Rejected),
            _ => Err(format!("unknown moderation status: {s}")),
        }
    }
}

/// Minimal surface every moderatable entity exposes. Photos and voice
/// clips both adapt to this so the transition rules live in one place.
pub trait Moderatable {
    fn status(&self) -> ModerationStatus;
    fn set_status(&mut self, status: ModerationStatus);
    fn owner_id(&self) -> Uuid;
}

/// A requested transition and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The async pipeline or a reviewer cleared the asset.
    Approve,
    /// The async pipeline or a reviewer rejected the asset.
    Reject,
    /// A user report escalates for manual attention.
    Escalate,
    /// A moderator explicitly overrides the current state. The only
    /// transition allowed to leave `Rejected`.
    ManualOverride(ModerationStatus),
}

/// Apply a transition to the current status, returning the new status
/// or `None` when the transition is not permitted from this state.
///
/// Rules:
/// - `Rejected` is sticky: `Approve`, `Reject`, and `Escalate` all
///   leave it unchanged (returned as a no-op `None`); only
///   `ManualOverride` escapes it.
/// - `Escalate` never rejects; a single reporter cannot take content
///   down unilaterally.
pub fn apply_transition(current: ModerationStatus, transition: Transition) -> Option<ModerationStatus> {
    use ModerationStatus::*;

    match transition {
        Transition::Approve => match current {
            AutoApproved | PendingReview => Some(Approved),
            Approved | Rejected => None,
        },
        Transition::Reject => match current {
            AutoApproved | Approved | PendingReview => Some(Rejected),
            Rejected => None,
        },
        Transition::Escalate => match current {
            AutoApproved | Approved => Some(PendingReview),
            PendingReview | Rejected => None,
        },
        Transition::ManualOverride(target) => {
            if target == current {
                None
            } else {
                Some(target)
            }
        }
    }
}

/// Convenience: apply a transition directly to an entity, returning
/// the new status when one was applied.
pub fn transition<M: Moderatable>(entity: &mut M, t: Transition) -> Option<ModerationStatus> {
    let next = apply_transition(entity.status(), t)?;
    entity.set_status(next);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Asset {
        status: ModerationStatus,
        owner: Uuid,
    }

    impl Moderatable for Asset {
        fn status(&self) -> ModerationStatus {
            self.status
        }
        fn set_status(&mut self, status: ModerationStatus) {
            self.status = status;
        }
        fn owner_id(&self) -> Uuid {
            self.owner
        }
    }

    fn asset(status: ModerationStatus) -> Asset {
        Asset {
            status,
            owner: Uuid::nil(),
        }
    }

    #[test]
    fn auto_approved_is_servable_immediately() {
        assert!(ModerationStatus::AutoApproved.is_servable());
        assert!(ModerationStatus::PendingReview.is_servable());
        assert!(!ModerationStatus::Rejected.is_servable());
    }

    #[test]
    fn rejected_is_sticky_for_automated_transitions() {
        for t in [Transition::Approve, Transition::Reject, Transition::Escalate] {
            assert_eq!(apply_transition(ModerationStatus::Rejected, t), None);
        }
    }

    #[test]
    fn manual_override_escapes_rejected() {
        let mut a = asset(ModerationStatus::Rejected);
        let next = transition(&mut a, Transition::ManualOverride(ModerationStatus::Approved));
        assert_eq!(next, Some(ModerationStatus::Approved));
        assert_eq!(a.status(), ModerationStatus::Approved);
    }

    #[test]
    fn escalate_never_rejects() {
        assert_eq!(
            apply_transition(ModerationStatus::AutoApproved, Transition::Escalate),
            Some(ModerationStatus::PendingReview)
        );
        assert_eq!(
            apply_transition(ModerationStatus::PendingReview, Transition::Escalate),
            None
        );
    }

    #[test]
    fn pipeline_decisions_from_auto_approved() {
        assert_eq!(
            apply_transition(ModerationStatus::AutoApproved, Transition::Approve),
            Some(ModerationStatus::Approved)
        );
        assert_eq!(
            apply_transition(ModerationStatus::AutoApproved, Transition::Reject),
            Some(ModerationStatus::Rejected)
        );
    }

    #[test]
    fn unknown_stored_value_parses_to_pending_review() {
        assert_eq!(
            ModerationStatus::parse_or_default("garbage"),
            ModerationStatus::PendingReview
        );
        assert_eq!(
            ModerationStatus::parse_or_default("approved"),
            ModerationStatus::Approved
        );
    }

    #[test]
    fn roundtrips_through_storage_strings() {
        for s in [
            ModerationStatus::AutoApproved,
            ModerationStatus::Approved,
            ModerationStatus::PendingReview,
            ModerationStatus::Rejected,
        ] {
            assert_eq!(s.to_string().parse::<ModerationStatus>().unwrap(), s);
        }
    }
}
