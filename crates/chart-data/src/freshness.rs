//! Freshness evaluation for cached datasets.
//!
//! Ages are classified against a [`FreshnessPolicy`] using half-open
//! intervals:
//!
//! ```text
//!   [0, warning)      -> Fresh
//!   [warning, error)  -> Warning
//!   [error, ∞)        -> Stale
//! ```

use serde::Serialize;

use crate::models::{FreshnessPolicy, RefreshMethod};

/// Milliseconds per hour.
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Freshness class of a dataset. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Warning,
    Stale,
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Warning => write!(f, "warning"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// Age in hours between two epoch-millisecond timestamps.
///
/// A timestamp in the future (clock skew) counts as age zero.
pub fn age_hours(fetched_at_epoch_ms: i64, now_epoch_ms: i64) -> f64 {
    now_epoch_ms.saturating_sub(fetched_at_epoch_ms).max(0) as f64 / MS_PER_HOUR
}

/// Classify a dataset fetched at `fetched_at_epoch_ms` as of `now_epoch_ms`.
pub fn classify(fetched_at_epoch_ms: i64, now_epoch_ms: i64, policy: &FreshnessPolicy) -> Freshness {
    policy.classify_age(age_hours(fetched_at_epoch_ms, now_epoch_ms))
}

impl FreshnessPolicy {
    /// Classify an age in hours.
    pub fn classify_age(&self, age_hours: f64) -> Freshness {
        if age_hours < self.warning_threshold_hours() {
            Freshness::Fresh
        } else if age_hours < self.error_threshold_hours() {
            Freshness::Warning
        } else {
            Freshness::Stale
        }
    }

    /// Whether a dataset of this age must not be served.
    ///
    /// Only applies when `block_on_stale` is set. Sources refreshed by hand get
    /// the manual grace period added to the error threshold first.
    pub fn blocks_serving(&self, age_hours: f64, refresh_method: RefreshMethod) -> bool {
        self.block_on_stale()
            && age_hours >= self.effective_error_threshold_hours(refresh_method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn policy() -> FreshnessPolicy {
        FreshnessPolicy::new(24.0, 48.0, true).unwrap()
    }

    #[test]
    fn test_classify_fresh_warning_stale() {
        let p = policy();
        assert_eq!(classify(0, HOUR_MS, &p), Freshness::Fresh);
        assert_eq!(classify(0, 30 * HOUR_MS, &p), Freshness::Warning);
        assert_eq!(classify(0, 60 * HOUR_MS, &p), Freshness::Stale);
    }

    #[test]
    fn test_warning_boundary_is_warning() {
        assert_eq!(classify(0, 24 * HOUR_MS, &policy()), Freshness::Warning);
    }

    #[test]
    fn test_error_boundary_is_stale() {
        assert_eq!(classify(0, 48 * HOUR_MS, &policy()), Freshness::Stale);
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        assert_eq!(age_hours(10 * HOUR_MS, 0), 0.0);
        assert_eq!(classify(10 * HOUR_MS, 0, &policy()), Freshness::Fresh);
    }

    #[test]
    fn test_blocking_requires_flag() {
        let lenient = FreshnessPolicy::new(24.0, 48.0, false).unwrap();
        assert!(!lenient.blocks_serving(100.0, RefreshMethod::ApiPoll));
        assert!(policy().blocks_serving(100.0, RefreshMethod::ApiPoll));
    }

    #[test]
    fn test_manual_grace_delays_blocking() {
        let p = policy().with_manual_grace_period(24.0).unwrap();

        // 60h: past the error threshold but inside the grace period
        assert!(!p.blocks_serving(60.0, RefreshMethod::ManualUpdate));
        assert!(p.blocks_serving(60.0, RefreshMethod::ApiPoll));
        assert!(p.blocks_serving(72.0, RefreshMethod::ManualUpdate));

        // Classification itself is unaffected by the grace period
        assert_eq!(p.classify_age(60.0), Freshness::Stale);
    }
}
