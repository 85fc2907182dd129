use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ChartDataError;

/// How a dataset is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Produced by invoking a CLI service
    CliApi,
    /// A file maintained by hand
    Manual,
    /// CLI service with a file mirror kept alongside it
    Hybrid,
    /// A file written by some other process
    FileWatch,
}

/// How the dataset behind a source gets refreshed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMethod {
    ApiPoll,
    ManualUpdate,
    HybridSync,
    FileWatch,
}

/// Expected update cadence of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    RealTime,
    Daily,
    Weekly,
    EventDriven,
    Scheduled,
}

/// Payload format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
}

impl DataFormat {
    /// Infers the format from a file extension (`.csv`, `.json`).
    pub fn from_location(location: &str) -> Option<Self> {
        let extension = Path::new(location).extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("csv") {
            Some(Self::Csv)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// Raw, unvalidated shape of a [`DataSourceConfig`] as it appears in a catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceSpec {
    pub source_type: SourceType,
    pub location: String,
    pub refresh_method: RefreshMethod,
    pub frequency: Frequency,
    #[serde(default)]
    pub cli_service: Option<String>,
    #[serde(default)]
    pub format: Option<DataFormat>,
}

/// One location/method for obtaining a dataset.
///
/// Immutable once constructed. Construction rejects an empty location, a
/// `cli-api` source without a service reference, and sources whose payload
/// format can be neither read from the declaration nor inferred from the
/// location's extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DataSourceSpec")]
pub struct DataSourceConfig {
    source_type: SourceType,
    location: String,
    refresh_method: RefreshMethod,
    frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    cli_service: Option<String>,
    format: DataFormat,
}

impl DataSourceConfig {
    /// Create a validated source configuration.
    pub fn new(
        source_type: SourceType,
        location: impl Into<String>,
        refresh_method: RefreshMethod,
        frequency: Frequency,
        cli_service: Option<String>,
        format: Option<DataFormat>,
    ) -> Result<Self, ChartDataError> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(ChartDataError::InvalidConfig(
                "Data source location must not be empty".to_string(),
            ));
        }

        let cli_service = cli_service
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if source_type == SourceType::CliApi && cli_service.is_none() {
            return Err(ChartDataError::InvalidConfig(format!(
                "cli-api source '{}' must reference a CLI service",
                location
            )));
        }

        let format = match format.or_else(|| DataFormat::from_location(&location)) {
            Some(f) => f,
            None => {
                return Err(ChartDataError::InvalidConfig(format!(
                    "Cannot determine payload format for source '{}'",
                    location
                )))
            }
        };

        Ok(Self {
            source_type,
            location,
            refresh_method,
            frequency,
            cli_service,
            format,
        })
    }

    /// A file read directly from disk (`file-watch`, or `manual` when the
    /// refresh method is `manual-update`).
    pub fn file(
        location: impl Into<String>,
        refresh_method: RefreshMethod,
        frequency: Frequency,
    ) -> Result<Self, ChartDataError> {
        let source_type = if refresh_method == RefreshMethod::ManualUpdate {
            SourceType::Manual
        } else {
            SourceType::FileWatch
        };
        Self::new(source_type, location, refresh_method, frequency, None, None)
    }

    /// A dataset produced by a CLI service.
    pub fn cli(
        service: impl Into<String>,
        location: impl Into<String>,
        frequency: Frequency,
    ) -> Result<Self, ChartDataError> {
        Self::new(
            SourceType::CliApi,
            location,
            RefreshMethod::ApiPoll,
            frequency,
            Some(service.into()),
            None,
        )
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn refresh_method(&self) -> RefreshMethod {
        self.refresh_method
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn cli_service(&self) -> Option<&str> {
        self.cli_service.as_deref()
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }
}

impl TryFrom<DataSourceSpec> for DataSourceConfig {
    type Error = ChartDataError;

    fn try_from(spec: DataSourceSpec) -> Result<Self, Self::Error> {
        Self::new(
            spec.source_type,
            spec.location,
            spec.refresh_method,
            spec.frequency,
            spec.cli_service,
            spec.format,
        )
    }
}
