// Staleness and freshness policy.
// Every check of a long operation's age or of cached results' age goes through here.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::session::{CachedResults, LongOperation};

/// A long operation older than this is presumed abandoned: 5 minutes.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Cached results older than this are not restored: 24 hours.
pub const DEFAULT_RESULTS_FRESH_FOR: Duration = Duration::from_secs(24 * 60 * 60);

/// Time thresholds applied during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub stale_after: Duration,
    pub results_fresh_for: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            results_fresh_for: DEFAULT_RESULTS_FRESH_FOR,
        }
    }
}

/// Age of a timestamp relative to `now`. Timestamps in the future have age zero.
fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

impl LongOperation {
    /// Check if this operation has been in flight longer than the policy allows.
    pub fn is_stale(&self, now: DateTime<Utc>, policy: &Policy) -> bool {
        age(self.started_at, now) > policy.stale_after
    }
}

impl CachedResults {
    /// Check if these results are recent enough to be shown again.
    pub fn is_fresh(&self, now: DateTime<Utc>, policy: &Policy) -> bool {
        age(self.saved_at, now) <= policy.results_fresh_for
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as Elapsed;

    use crate::state::{OperationHandle, OperationKind};

    fn operation(started_at: DateTime<Utc>) -> LongOperation {
        LongOperation {
            handle: OperationHandle::new(),
            kind: OperationKind::Tailor,
            started_at,
            job_description: None,
            resume_id: Some("r1".to_string()),
        }
    }

    #[test]
    fn test_operation_staleness_boundary() {
        let now = Utc::now();
        let policy = Policy::default();

        assert!(!operation(now - Elapsed::minutes(1)).is_stale(now, &policy));
        // Exactly at the threshold is still live
        assert!(!operation(now - Elapsed::minutes(5)).is_stale(now, &policy));
        assert!(operation(now - Elapsed::minutes(5) - Elapsed::seconds(1)).is_stale(now, &policy));
    }

    #[test]
    fn test_future_start_is_not_stale() {
        let now = Utc::now();
        assert!(!operation(now + Elapsed::hours(2)).is_stale(now, &Policy::default()));
    }

    #[test]
    fn test_results_freshness() {
        let now = Utc::now();
        let policy = Policy::default();
        let mut results = CachedResults {
            payload: serde_json::json!({"fullResume": "..."}),
            saved_at: now - Elapsed::hours(23),
            resume_id: "r1".to_string(),
        };
        assert!(results.is_fresh(now, &policy));

        results.saved_at = now - Elapsed::hours(25);
        assert!(!results.is_fresh(now, &policy));
    }

    #[test]
    fn test_custom_thresholds() {
        let now = Utc::now();
        let policy = Policy {
            stale_after: Duration::from_secs(30),
            results_fresh_for: Duration::from_secs(60),
        };
        assert!(operation(now - Elapsed::seconds(31)).is_stale(now, &policy));
    }
}
