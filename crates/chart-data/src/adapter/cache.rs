//! Cached dataset snapshots.

use serde::Serialize;

use crate::freshness::{age_hours, Freshness};
use crate::models::FreshnessPolicy;

/// A successfully fetched dataset.
///
/// Snapshots are immutable. A refresh builds a new one and swaps it in whole,
/// so a reader holding an `Arc<CachedDataset<R>>` never sees a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDataset<R> {
    pub rows: Vec<R>,
    pub fetched_at_epoch_ms: i64,
    /// Location of the source that produced the rows
    pub source: String,
}

impl<R> CachedDataset<R> {
    pub fn age_hours(&self, now_epoch_ms: i64) -> f64 {
        age_hours(self.fetched_at_epoch_ms, now_epoch_ms)
    }

    pub fn age_ms(&self, now_epoch_ms: i64) -> i64 {
        now_epoch_ms.saturating_sub(self.fetched_at_epoch_ms).max(0)
    }

    pub fn freshness(&self, now_epoch_ms: i64, policy: &FreshnessPolicy) -> Freshness {
        policy.classify_age(self.age_hours(now_epoch_ms))
    }

    pub fn status(&self, now_epoch_ms: i64, policy: &FreshnessPolicy) -> CacheStatus {
        let age_hours = self.age_hours(now_epoch_ms);
        CacheStatus {
            rows: self.rows.len(),
            fetched_at_epoch_ms: self.fetched_at_epoch_ms,
            age_hours,
            freshness: policy.classify_age(age_hours),
            source: self.source.clone(),
        }
    }
}

/// Row-type independent view of a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub rows: usize,
    pub fetched_at_epoch_ms: i64,
    pub age_hours: f64,
    pub freshness: Freshness,
    pub source: String,
}
