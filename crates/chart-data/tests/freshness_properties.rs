//! Property-based tests for freshness classification.

use chartdeck_data::{classify, Freshness, FreshnessPolicy, RefreshMethod};
use proptest::prelude::*;

const HOUR_MS: i64 = 3_600_000;

// =============================================================================
// Generators
// =============================================================================

/// Generates a valid policy: 0 < warning < error.
fn arb_policy() -> impl Strategy<Value = FreshnessPolicy> {
    (0.1f64..500.0, 0.1f64..500.0, any::<bool>()).prop_map(|(warning, gap, block)| {
        FreshnessPolicy::new(warning, warning + gap, block).unwrap()
    })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Increasing age never moves a dataset to a better class.
    #[test]
    fn prop_classify_is_monotonic(
        policy in arb_policy(),
        fetched_at in 0i64..(1_000 * HOUR_MS),
        age_a in 0i64..(2_000 * HOUR_MS),
        age_b in 0i64..(2_000 * HOUR_MS),
    ) {
        let (younger, older) = if age_a <= age_b { (age_a, age_b) } else { (age_b, age_a) };

        let young_class = classify(fetched_at, fetched_at + younger, &policy);
        let old_class = classify(fetched_at, fetched_at + older, &policy);

        prop_assert!(young_class <= old_class);
    }

    /// A dataset exactly at a threshold falls in the worse class.
    #[test]
    fn prop_thresholds_are_half_open(policy in arb_policy()) {
        prop_assert_eq!(policy.classify_age(policy.warning_threshold_hours()), Freshness::Warning);
        prop_assert_eq!(policy.classify_age(policy.error_threshold_hours()), Freshness::Stale);
        prop_assert_eq!(policy.classify_age(0.0), Freshness::Fresh);
    }

    /// Blocking only ever happens to stale data.
    #[test]
    fn prop_blocked_implies_stale(policy in arb_policy(), age in 0.0f64..2_000.0) {
        if policy.blocks_serving(age, RefreshMethod::ApiPoll) {
            prop_assert_eq!(policy.classify_age(age), Freshness::Stale);
        }
    }
}

#[test]
fn test_invalid_thresholds_rejected_at_construction() {
    assert!(FreshnessPolicy::new(24.0, 24.0, false).is_err());
    assert!(FreshnessPolicy::new(48.0, 24.0, false).is_err());
    assert!(FreshnessPolicy::new(0.0, 24.0, false).is_err());
}
