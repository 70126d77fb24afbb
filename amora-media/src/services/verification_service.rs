use chrono::Utc;
use diesel::prelude::*;
use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::collaborators::face::{FaceMatchError, FaceMatcher};
use crate::models::{NewVerificationAttempt, Photo, VerificationAttempt};
use crate::moderation::status::{Moderatable, ModerationStatus};
use crate::schema::{photos, verification_attempts};
use crate::AppState;

/// Same-day rejections allowed before the engine stops calling the
/// comparison collaborator for this user.
pub const DAILY_REJECTION_BUDGET: i64 = 3;

/// Inclusive lower bounds, calibrated for the pinned recognition
/// model. Similarity is 1 - distance.
pub const VERIFIED_THRESHOLD: f64 = 0.70;
pub const REVIEW_THRESHOLD: f64 = 0.60;

/// Decision for a completed comparison. `RateLimited` and collaborator
/// errors never reach this type: they are not comparison results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Verified,
    PendingReview,
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Verified => "verified",
            Decision::PendingReview => "pending_review",
            Decision::Rejected => "rejected",
        }
    }

    /// Only genuine mismatches spend budget. Borderline scores go to
    /// manual review at no cost to the user.
    pub fn consumes_budget(self) -> bool {
        matches!(self, Decision::Rejected)
    }
}

/// Map a similarity score onto the decision buckets.
pub fn decide(similarity: f64) -> Decision {
    if similarity >= VERIFIED_THRESHOLD {
        Decision::Verified
    } else if similarity >= REVIEW_THRESHOLD {
        Decision::PendingReview
    } else {
        Decision::Rejected
    }
}

pub fn remaining_attempts(rejected_today: i64) -> i64 {
    (DAILY_REJECTION_BUDGET - rejected_today).max(0)
}

/// Outcome of one engine run, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    RateLimited,
    Evaluated(Verdict),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub similarity: f64,
    pub decision: Decision,
    pub spoof_check_passed: bool,
    pub rejection_reason: Option<String>,
}

/// Run the comparison under the attempt budget. The collaborator is
/// never invoked once the budget is exhausted, and collaborator
/// failures propagate untouched so the caller can map them to a
/// non-persisted `error` outcome.
pub async fn run_engine(
    rejected_today: i64,
    matcher: &dyn FaceMatcher,
    live: &[u8],
    reference: &[u8],
) -> Result<EngineOutcome, FaceMatchError> {
    if rejected_today >= DAILY_REJECTION_BUDGET {
        return Ok(EngineOutcome::RateLimited);
    }

    let comparison = matcher.compare(live, reference).await?;
    let similarity = 1.0 - comparison.distance;

    let verdict = if !comparison.facial_region_detected {
        Verdict {
            similarity,
            decision: Decision::Rejected,
            spoof_check_passed: false,
            rejection_reason: Some("liveness check failed, use a direct camera capture".to_string()),
        }
    } else {
        let decision = decide(similarity);
        let rejection_reason = match decision {
            Decision::Rejected => Some("the capture does not match your profile photo".to_string()),
            _ => None,
        };
        Verdict {
            similarity,
            decision,
            spoof_check_passed: true,
            rejection_reason,
        }
    };

    Ok(EngineOutcome::Evaluated(verdict))
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub outcome: Decision,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub attempts_remaining_today: i64,
}

#[derive(Debug, Serialize)]
pub struct VerificationStatus {
    pub is_verified: bool,
    pub last_attempt: Option<AttemptSummary>,
    pub attempts_remaining_today: i64,
}

#[derive(Debug, Serialize)]
pub struct AttemptSummary {
    pub outcome: String,
    pub similarity: f64,
    pub created_at: chrono::DateTime<Utc>,
}

fn today_start() -> chrono::DateTime<Utc> {
    Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

fn count_rejected_today(conn: &mut diesel::PgConnection, user_id: Uuid) -> AppResult<i64> {
    let count = verification_attempts::table
        .filter(verification_attempts::user_id.eq(user_id))
        .filter(verification_attempts::outcome.eq(Decision::Rejected.as_str()))
        .filter(verification_attempts::created_at.ge(today_start()))
        .count()
        .get_result(conn)?;
    Ok(count)
}

/// Verify a freshly captured selfie against the caller's primary
/// profile photo.
pub async fn verify(
    state: &AppState,
    user_id: Uuid,
    capture: &[u8],
) -> AppResult<VerificationResponse> {
    let (primary, rejected_today) = {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

        let primary = photos::table
            .filter(photos::owner_id.eq(user_id))
            .filter(photos::is_primary.eq(true))
            .filter(photos::is_deleted.eq(false))
            .first::<Photo>(&mut conn)
            .optional()?
            .filter(|p| p.status() != ModerationStatus::Rejected)
            .ok_or_else(|| {
                AppError::new(
                    ErrorCode::NoProfilePhoto,
                    "set a primary profile photo before verifying",
                )
            })?;

        let rejected_today = count_rejected_today(&mut conn, user_id)?;
        (primary, rejected_today)
    };

    let reference = state
        .minio
        .get(&primary.storage_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, photo_id = %primary.id, "reference photo unavailable");
            AppError::new(
                ErrorCode::VerificationUnavailable,
                "verification is temporarily unavailable, try again later",
            )
        })?;

    let outcome = run_engine(rejected_today, state.face.as_ref(), capture, &reference)
        .await
        .map_err(|e| {
            // Infrastructure failure: no attempt row, budget untouched.
            tracing::error!(error = %e, user_id = %user_id, "face comparison failed");
            counter!("media_verification_outcomes_total", "outcome" => "error").increment(1);
            AppError::new(
                ErrorCode::VerificationUnavailable,
                "verification is temporarily unavailable, try again later",
            )
        })?;

    let verdict = match outcome {
        EngineOutcome::RateLimited => {
            counter!("media_verification_outcomes_total", "outcome" => "rate_limited").increment(1);
            return Err(AppError::new(
                ErrorCode::VerificationRateLimited,
                "daily verification limit reached, try again tomorrow",
            ));
        }
        EngineOutcome::Evaluated(verdict) => verdict,
    };

    let attempt = NewVerificationAttempt {
        user_id,
        photo_id: primary.id,
        similarity: verdict.similarity,
        outcome: verdict.decision.as_str().to_string(),
        rejection_reason: verdict.rejection_reason.clone(),
        spoof_check_passed: verdict.spoof_check_passed,
    };

    {
        let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;
        diesel::insert_into(verification_attempts::table)
            .values(&attempt)
            .execute(&mut conn)?;
    }

    counter!("media_verification_outcomes_total", "outcome" => verdict.decision.as_str())
        .increment(1);

    tracing::info!(
        user_id = %user_id,
        outcome = verdict.decision.as_str(),
        similarity = verdict.similarity,
        "verification attempt recorded"
    );

    let spent = rejected_today + i64::from(verdict.decision.consumes_budget());

    Ok(VerificationResponse {
        outcome: verdict.decision,
        similarity: verdict.similarity,
        message: verdict.rejection_reason,
        attempts_remaining_today: remaining_attempts(spent),
    })
}

pub fn status(state: &AppState, user_id: Uuid) -> AppResult<VerificationStatus> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let is_verified: i64 = verification_attempts::table
        .filter(verification_attempts::user_id.eq(user_id))
        .filter(verification_attempts::outcome.eq(Decision::Verified.as_str()))
        .count()
        .get_result(&mut conn)?;

    let last: Option<VerificationAttempt> = verification_attempts::table
        .filter(verification_attempts::user_id.eq(user_id))
        .order(verification_attempts::created_at.desc())
        .first(&mut conn)
        .optional()?;

    let rejected_today = count_rejected_today(&mut conn, user_id)?;

    Ok(VerificationStatus {
        is_verified: is_verified > 0,
        last_attempt: last.map(|a| AttemptSummary {
            outcome: a.outcome,
            similarity: a.similarity,
            created_at: a.created_at,
        }),
        attempts_remaining_today: remaining_attempts(rejected_today),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::face::FaceComparison;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedMatcher {
        distance: f64,
        facial_region: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedMatcher {
        fn returning(distance: f64) -> Self {
            Self {
                distance,
                facial_region: true,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                distance: 0.0,
                facial_region: true,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn spoofed(distance: f64) -> Self {
            Self {
                distance,
                facial_region: false,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FaceMatcher for ScriptedMatcher {
        async fn compare(&self, _live: &[u8], _reference: &[u8]) -> Result<FaceComparison, FaceMatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FaceMatchError::Status(503));
            }
            Ok(FaceComparison {
                distance: self.distance,
                facial_region_detected: self.facial_region,
            })
        }
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(decide(0.70), Decision::Verified);
        assert_eq!(decide(0.95), Decision::Verified);
        assert_eq!(decide(0.60), Decision::PendingReview);
        assert_eq!(decide(0.699), Decision::PendingReview);
        assert_eq!(decide(0.599), Decision::Rejected);
        assert_eq!(decide(0.0), Decision::Rejected);
    }

    #[test]
    fn only_rejections_consume_budget() {
        assert!(Decision::Rejected.consumes_budget());
        assert!(!Decision::Verified.consumes_budget());
        assert!(!Decision::PendingReview.consumes_budget());
    }

    #[test]
    fn remaining_attempts_never_negative() {
        assert_eq!(remaining_attempts(0), 3);
        assert_eq!(remaining_attempts(3), 0);
        assert_eq!(remaining_attempts(7), 0);
    }

    #[tokio::test]
    async fn similarity_is_inverse_of_distance() {
        let matcher = ScriptedMatcher::returning(0.25);
        let outcome = run_engine(0, &matcher, b"live", b"ref").await.unwrap();
        match outcome {
            EngineOutcome::Evaluated(v) => {
                assert!((v.similarity - 0.75).abs() < 1e-9);
                assert_eq!(v.decision, Decision::Verified);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_budget_never_calls_the_collaborator() {
        let matcher = ScriptedMatcher::returning(0.0);
        let outcome = run_engine(DAILY_REJECTION_BUDGET, &matcher, b"live", b"ref")
            .await
            .unwrap();
        assert_eq!(outcome, EngineOutcome::RateLimited);
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn budget_below_limit_still_compares() {
        let matcher = ScriptedMatcher::returning(0.5);
        let outcome = run_engine(DAILY_REJECTION_BUDGET - 1, &matcher, b"live", b"ref")
            .await
            .unwrap();
        assert!(matches!(outcome, EngineOutcome::Evaluated(_)));
        assert_eq!(matcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn collaborator_failure_propagates_without_a_verdict() {
        let matcher = ScriptedMatcher::failing();
        let result = run_engine(0, &matcher, b"live", b"ref").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn spoof_failure_rejects_with_reason() {
        // Distance would otherwise verify; the liveness signal wins.
        let matcher = ScriptedMatcher::spoofed(0.1);
        let outcome = run_engine(0, &matcher, b"live", b"ref").await.unwrap();
        match outcome {
            EngineOutcome::Evaluated(v) => {
                assert_eq!(v.decision, Decision::Rejected);
                assert!(!v.spoof_check_passed);
                assert!(v.rejection_reason.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn borderline_similarity_goes_to_review() {
        // distance 0.35 -> similarity 0.65
        let matcher = ScriptedMatcher::returning(0.35);
        let outcome = run_engine(0, &matcher, b"live", b"ref").await.unwrap();
        match outcome {
            EngineOutcome::Evaluated(v) => {
                assert_eq!(v.decision, Decision::PendingReview);
                assert!(v.rejection_reason.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
