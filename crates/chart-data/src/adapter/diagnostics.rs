//! Fetch attempt tracking.
//!
//! Every source attempt made while producing a dataset is recorded as a
//! [`FetchAttempt`], so callers get a structured trail instead of log lines.

use serde::Serialize;

/// Result of a single attempt against one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// The payload was fetched and parsed.
    Success { rows: usize },

    /// Fetching or parsing failed.
    Failed { reason: String },
}

/// Record of one attempt against one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAttempt {
    /// Source location (file path or CLI service output name)
    pub source: String,
    /// Position in `[primary, ...fallbacks]`
    pub source_index: usize,
    /// 1-based attempt number against this source
    pub attempt: u32,
    /// Backoff waited before this attempt, for retries
    pub delay_ms: Option<u64>,
    pub outcome: AttemptOutcome,
}

impl FetchAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }
}

/// Trail of attempts made by one fetch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDiagnostics {
    pub attempts: Vec<FetchAttempt>,
    /// The dataset was served from cache without I/O.
    pub from_cache: bool,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached() -> Self {
        Self {
            attempts: Vec::new(),
            from_cache: true,
        }
    }

    pub fn record_success(
        &mut self,
        source: &str,
        source_index: usize,
        attempt: u32,
        delay_ms: Option<u64>,
        rows: usize,
    ) {
        self.attempts.push(FetchAttempt {
            source: source.to_string(),
            source_index,
            attempt,
            delay_ms,
            outcome: AttemptOutcome::Success { rows },
        });
    }

    pub fn record_failure(
        &mut self,
        source: &str,
        source_index: usize,
        attempt: u32,
        delay_ms: Option<u64>,
        reason: String,
    ) {
        self.attempts.push(FetchAttempt {
            source: source.to_string(),
            source_index,
            attempt,
            delay_ms,
            outcome: AttemptOutcome::Failed { reason },
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        if self.from_cache {
            return "CACHE".to_string();
        }
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Success { rows } => {
                    format!("{}#{}: SUCCESS ({} rows)", a.source, a.attempt, rows)
                }
                AttemptOutcome::Failed { reason } => {
                    format!("{}#{}: ERROR ({})", a.source, a.attempt, reason)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any attempt succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(FetchAttempt::is_success)
    }

    /// Number of delayed retries (attempts after the first on any source).
    pub fn retries(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_retry()).count()
    }

    /// The source that produced the data, if any.
    pub fn winning_source(&self) -> Option<&FetchAttempt> {
        self.attempts.iter().find(|a| a.is_success())
    }

    /// Get all failure reasons.
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.outcome {
                AttemptOutcome::Failed { reason } => Some((a.source.as_str(), reason.as_str())),
                AttemptOutcome::Success { .. } => None,
            })
            .collect()
    }
}
