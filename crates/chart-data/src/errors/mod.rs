//! Error types and retry classification for the chart data crate.
//!
//! This module provides:
//! - [`ChartDataError`]: The main error enum for registry and fetch operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

use crate::adapter::FetchAttempt;

/// Errors that can occur while registering charts or fetching their data.
///
/// The enum is `Clone` because a single in-flight fetch is shared by every
/// caller coalesced onto it, and each of them receives the same outcome.
#[derive(Error, Debug, Clone)]
pub enum ChartDataError {
    /// Every source (primary and fallbacks) failed after its retries.
    #[error("Data unavailable for '{chart_type}' after {} attempts", .attempts.len())]
    DataUnavailable {
        /// The chart whose data could not be produced
        chart_type: String,
        /// Every attempt made, in order
        attempts: Vec<FetchAttempt>,
    },

    /// The cached dataset is too old to be served and the forced refetch failed.
    #[error("Stale data blocked for '{chart_type}' (age {age_hours:.1}h)")]
    StaleDataBlocked {
        /// The chart whose cache was blocked
        chart_type: String,
        /// Age of the blocked cache entry
        age_hours: f64,
        /// Attempts made by the forced refetch
        attempts: Vec<FetchAttempt>,
    },

    /// The caller cancelled the fetch.
    #[error("Fetch cancelled")]
    Cancelled,

    /// A chart type (or dashboard) was registered twice.
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// The payload did not conform to the expected row schema.
    #[error("Parse error in {location}: {message}")]
    ParseError {
        /// Source location the payload came from
        location: String,
        /// What went wrong
        message: String,
    },

    /// A configuration value violated an invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No chart with this identifier is registered.
    #[error("Unknown chart type: {0}")]
    UnknownChartType(String),

    /// The chart is registered without a pipeline-managed data source.
    #[error("No data source configured for chart: {0}")]
    NoDataSource(String),

    /// The chart's status is `disabled`.
    #[error("Chart is disabled: {0}")]
    ChartDisabled(String),

    /// The refresh policy does not allow manual refreshes.
    #[error("Manual refresh not allowed for chart: {0}")]
    ManualRefreshDisabled(String),

    /// A source references a CLI service that is not in the service catalog.
    #[error("CLI service not found: {0}")]
    ServiceNotFound(String),

    /// A CLI service did not finish within its timeout.
    #[error("Timeout: {service} after {seconds}s")]
    Timeout {
        /// The service that timed out
        service: String,
        /// The configured timeout
        seconds: u64,
    },

    /// A CLI service could not be spawned or exited unsuccessfully.
    #[error("Command failed: {service} ({status}) {stderr}")]
    CommandFailed {
        /// The service that failed
        service: String,
        /// Exit status description
        status: String,
        /// Tail of the captured stderr
        stderr: String,
    },

    /// Reading a dataset file failed.
    #[error("I/O error reading {location}: {message}")]
    Io {
        /// The file that could not be read
        location: String,
        /// The underlying error message
        message: String,
    },
}

impl ChartDataError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use chartdeck_data::errors::{ChartDataError, RetryClass};
    ///
    /// let error = ChartDataError::Timeout { service: "btc".to_string(), seconds: 30 };
    /// assert_eq!(error.retry_class(), RetryClass::Retry);
    ///
    /// assert_eq!(ChartDataError::Cancelled.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Transient source failures
            Self::ParseError { .. }
            | Self::Timeout { .. }
            | Self::CommandFailed { .. }
            | Self::Io { .. } => RetryClass::Retry,

            // Misconfigured source - retrying the same one is pointless
            Self::ServiceNotFound(_) | Self::InvalidConfig(_) => RetryClass::NextSource,

            Self::Cancelled
            | Self::DataUnavailable { .. }
            | Self::StaleDataBlocked { .. }
            | Self::DuplicateRegistration(_)
            | Self::UnknownChartType(_)
            | Self::NoDataSource(_)
            | Self::ChartDisabled(_)
            | Self::ManualRefreshDisabled(_) => RetryClass::Never,
        }
    }

    /// Attempt trail carried by exhausted-source errors.
    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            Self::DataUnavailable { attempts, .. } | Self::StaleDataBlocked { attempts, .. } => {
                attempts
            }
            _ => &[],
        }
    }

    /// True for the states a renderer should show as "data unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::StaleDataBlocked { .. } | Self::NoDataSource(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AttemptOutcome;

    #[test]
    fn test_transient_errors_retry() {
        let errors = [
            ChartDataError::ParseError {
                location: "data/btc.csv".to_string(),
                message: "missing field `close`".to_string(),
            },
            ChartDataError::Timeout {
                service: "btc-cli".to_string(),
                seconds: 30,
            },
            ChartDataError::CommandFailed {
                service: "btc-cli".to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            },
            ChartDataError::Io {
                location: "data/btc.csv".to_string(),
                message: "No such file or directory".to_string(),
            },
        ];

        for error in errors {
            assert_eq!(error.retry_class(), RetryClass::Retry, "{error}");
        }
    }

    #[test]
    fn test_missing_service_skips_to_next_source() {
        let error = ChartDataError::ServiceNotFound("trade-cli".to_string());
        assert_eq!(error.retry_class(), RetryClass::NextSource);
    }

    #[test]
    fn test_cancelled_never_retries() {
        assert_eq!(ChartDataError::Cancelled.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_registration_errors_never_retry() {
        let error = ChartDataError::DuplicateRegistration("btc-price".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_attempts_exposed_on_unavailable() {
        let error = ChartDataError::DataUnavailable {
            chart_type: "btc-price".to_string(),
            attempts: vec![FetchAttempt {
                source: "data/btc.csv".to_string(),
                source_index: 0,
                attempt: 1,
                delay_ms: None,
                outcome: AttemptOutcome::Failed {
                    reason: "boom".to_string(),
                },
            }],
        };

        assert_eq!(error.attempts().len(), 1);
        assert!(error.is_unavailable());
        assert!(ChartDataError::Cancelled.attempts().is_empty());
    }

    #[test]
    fn test_error_display() {
        let error = ChartDataError::UnknownChartType("eth-price".to_string());
        assert_eq!(format!("{}", error), "Unknown chart type: eth-price");

        let error = ChartDataError::Timeout {
            service: "btc-cli".to_string(),
            seconds: 5,
        };
        assert_eq!(format!("{}", error), "Timeout: btc-cli after 5s");

        let error = ChartDataError::DataUnavailable {
            chart_type: "btc-price".to_string(),
            attempts: Vec::new(),
        };
        assert_eq!(
            format!("{}", error),
            "Data unavailable for 'btc-price' after 0 attempts"
        );
    }
}
