use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ChartDataError;

use super::source::RefreshMethod;

/// Default warning threshold: one day.
const DEFAULT_WARNING_THRESHOLD_HOURS: f64 = 24.0;

/// Default error threshold: three days.
const DEFAULT_ERROR_THRESHOLD_HOURS: f64 = 72.0;

/// Default delay before the first retry.
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Upper bound for any single retry delay.
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Default number of retries per source.
const DEFAULT_MAX_RETRIES: u32 = 2;

// =============================================================================
// Freshness Policy
// =============================================================================

/// Raw, unvalidated shape of a [`FreshnessPolicy`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FreshnessPolicySpec {
    pub warning_threshold_hours: f64,
    pub error_threshold_hours: f64,
    #[serde(default)]
    pub block_on_stale: bool,
    #[serde(default)]
    pub manual_grace_period_hours: Option<f64>,
}

/// Staleness thresholds for a cached dataset.
///
/// Invariants (checked at construction): `0 < warning < error`, and the
/// optional manual grace period is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FreshnessPolicySpec")]
pub struct FreshnessPolicy {
    warning_threshold_hours: f64,
    error_threshold_hours: f64,
    block_on_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    manual_grace_period_hours: Option<f64>,
}

impl FreshnessPolicy {
    pub fn new(
        warning_threshold_hours: f64,
        error_threshold_hours: f64,
        block_on_stale: bool,
    ) -> Result<Self, ChartDataError> {
        if !warning_threshold_hours.is_finite() || warning_threshold_hours <= 0.0 {
            return Err(ChartDataError::InvalidConfig(format!(
                "Warning threshold must be a positive number of hours, got {}",
                warning_threshold_hours
            )));
        }
        if !error_threshold_hours.is_finite() || error_threshold_hours <= warning_threshold_hours
        {
            return Err(ChartDataError::InvalidConfig(format!(
                "Error threshold ({}h) must be greater than warning threshold ({}h)",
                error_threshold_hours, warning_threshold_hours
            )));
        }

        Ok(Self {
            warning_threshold_hours,
            error_threshold_hours,
            block_on_stale,
            manual_grace_period_hours: None,
        })
    }

    /// Relax the error threshold for manually updated sources.
    pub fn with_manual_grace_period(mut self, hours: f64) -> Result<Self, ChartDataError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(ChartDataError::InvalidConfig(format!(
                "Manual grace period must be a non-negative number of hours, got {}",
                hours
            )));
        }
        self.manual_grace_period_hours = Some(hours);
        Ok(self)
    }

    pub fn warning_threshold_hours(&self) -> f64 {
        self.warning_threshold_hours
    }

    pub fn error_threshold_hours(&self) -> f64 {
        self.error_threshold_hours
    }

    pub fn block_on_stale(&self) -> bool {
        self.block_on_stale
    }

    pub fn manual_grace_period_hours(&self) -> Option<f64> {
        self.manual_grace_period_hours
    }

    /// Error threshold used when deciding whether to block, after applying the
    /// manual grace period to `manual-update` sources.
    pub fn effective_error_threshold_hours(&self, refresh_method: RefreshMethod) -> f64 {
        match (refresh_method, self.manual_grace_period_hours) {
            (RefreshMethod::ManualUpdate, Some(grace)) => self.error_threshold_hours + grace,
            _ => self.error_threshold_hours,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            warning_threshold_hours: DEFAULT_WARNING_THRESHOLD_HOURS,
            error_threshold_hours: DEFAULT_ERROR_THRESHOLD_HOURS,
            block_on_stale: false,
            manual_grace_period_hours: None,
        }
    }
}

impl TryFrom<FreshnessPolicySpec> for FreshnessPolicy {
    type Error = ChartDataError;

    fn try_from(spec: FreshnessPolicySpec) -> Result<Self, Self::Error> {
        let policy = Self::new(
            spec.warning_threshold_hours,
            spec.error_threshold_hours,
            spec.block_on_stale,
        )?;
        match spec.manual_grace_period_hours {
            Some(hours) => policy.with_manual_grace_period(hours),
            None => Ok(policy),
        }
    }
}

// =============================================================================
// Refresh Policy
// =============================================================================

/// How the delay grows between retries of the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryBackoff {
    /// base, 2·base, 4·base, ...
    #[default]
    Exponential,
    /// base, 2·base, 3·base, ...
    Linear,
    /// base, base, base, ...
    Fixed,
}

impl RetryBackoff {
    /// Delay before the `retry`-th retry (1-based), capped at `max`.
    pub fn delay(&self, retry: u32, base: Duration, max: Duration) -> Duration {
        let retry = retry.max(1);
        let delay = match self {
            Self::Exponential => {
                let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            Self::Linear => base.saturating_mul(retry),
            Self::Fixed => base,
        };
        delay.min(max)
    }
}

/// Raw, unvalidated shape of a [`RefreshPolicy`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshPolicySpec {
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default)]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_true")]
    pub allow_manual_refresh: bool,
    #[serde(default)]
    pub refresh_on_visible: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_backoff: RetryBackoff,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_retry_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

/// Refresh cadence and retry behaviour for a chart's sources.
///
/// Invariant: `auto_refresh` implies a non-zero `refresh_interval_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RefreshPolicySpec")]
pub struct RefreshPolicy {
    auto_refresh: bool,
    refresh_interval_ms: u64,
    allow_manual_refresh: bool,
    refresh_on_visible: bool,
    max_retries: u32,
    retry_backoff: RetryBackoff,
    retry_base_delay_ms: u64,
    retry_max_delay_ms: u64,
}

impl RefreshPolicy {
    /// Pull-only policy with the given retry behaviour.
    pub fn new(max_retries: u32, retry_backoff: RetryBackoff) -> Self {
        Self {
            auto_refresh: false,
            refresh_interval_ms: 0,
            allow_manual_refresh: true,
            refresh_on_visible: false,
            max_retries,
            retry_backoff,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }

    /// Enable timer-driven refresh every `interval_ms`.
    pub fn with_auto_refresh(mut self, interval_ms: u64) -> Result<Self, ChartDataError> {
        if interval_ms == 0 {
            return Err(ChartDataError::InvalidConfig(
                "auto_refresh requires refresh_interval_ms > 0".to_string(),
            ));
        }
        self.auto_refresh = true;
        self.refresh_interval_ms = interval_ms;
        Ok(self)
    }

    /// Override the retry delay base and cap.
    pub fn with_retry_delays(mut self, base_ms: u64, max_ms: u64) -> Result<Self, ChartDataError> {
        if max_ms < base_ms {
            return Err(ChartDataError::InvalidConfig(format!(
                "retry_max_delay_ms ({}) must be >= retry_base_delay_ms ({})",
                max_ms, base_ms
            )));
        }
        self.retry_base_delay_ms = base_ms;
        self.retry_max_delay_ms = max_ms;
        Ok(self)
    }

    pub fn with_manual_refresh(mut self, allowed: bool) -> Self {
        self.allow_manual_refresh = allowed;
        self
    }

    pub fn with_refresh_on_visible(mut self, enabled: bool) -> Self {
        self.refresh_on_visible = enabled;
        self
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn allow_manual_refresh(&self) -> bool {
        self.allow_manual_refresh
    }

    pub fn refresh_on_visible(&self) -> bool {
        self.refresh_on_visible
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_backoff(&self) -> RetryBackoff {
        self.retry_backoff
    }

    /// Delay before the `retry`-th retry of a source (1-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.retry_backoff.delay(
            retry,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, RetryBackoff::Exponential)
    }
}

impl TryFrom<RefreshPolicySpec> for RefreshPolicy {
    type Error = ChartDataError;

    fn try_from(spec: RefreshPolicySpec) -> Result<Self, Self::Error> {
        if spec.auto_refresh && spec.refresh_interval_ms == 0 {
            return Err(ChartDataError::InvalidConfig(
                "auto_refresh requires refresh_interval_ms > 0".to_string(),
            ));
        }

        let policy = Self {
            auto_refresh: spec.auto_refresh,
            refresh_interval_ms: spec.refresh_interval_ms,
            ..Self::new(spec.max_retries, spec.retry_backoff)
        };

        policy
            .with_manual_refresh(spec.allow_manual_refresh)
            .with_refresh_on_visible(spec.refresh_on_visible)
            .with_retry_delays(spec.retry_base_delay_ms, spec.retry_max_delay_ms)
    }
}
