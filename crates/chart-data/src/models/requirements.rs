use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::policy::{FreshnessPolicy, RefreshPolicy};
use super::source::DataSourceConfig;

/// Lifecycle status of a chart's data pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartStatus {
    /// Data is fetched and kept fresh
    #[default]
    Active,
    /// Data is no longer updated; whatever was fetched keeps being served
    Frozen,
    /// Chart is switched off; fetching is refused
    Disabled,
}

/// What kind of dataset a chart consumes. Determines the row type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCategory {
    Raw,
    Portfolio,
    TradeHistory,
    OpenPositions,
    Processed,
}

impl std::fmt::Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Portfolio => write!(f, "portfolio"),
            Self::TradeHistory => write!(f, "trade-history"),
            Self::OpenPositions => write!(f, "open-positions"),
            Self::Processed => write!(f, "processed"),
        }
    }
}

/// Everything the pipeline needs to know to produce a chart's dataset.
///
/// The primary source is mandatory. Fallbacks are tried in declaration order
/// once the primary's retries are exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataRequirements {
    #[serde(default)]
    chart_status: ChartStatus,
    category: DataCategory,
    #[serde(default)]
    required_services: BTreeSet<String>,
    primary_source: DataSourceConfig,
    #[serde(default)]
    fallback_sources: Vec<DataSourceConfig>,
    #[serde(default)]
    freshness: FreshnessPolicy,
    #[serde(default)]
    refresh: RefreshPolicy,
}

impl DataRequirements {
    /// Active requirements with default policies and no fallbacks.
    pub fn new(category: DataCategory, primary_source: DataSourceConfig) -> Self {
        Self {
            chart_status: ChartStatus::Active,
            category,
            required_services: BTreeSet::new(),
            primary_source,
            fallback_sources: Vec::new(),
            freshness: FreshnessPolicy::default(),
            refresh: RefreshPolicy::default(),
        }
    }

    pub fn with_status(mut self, status: ChartStatus) -> Self {
        self.chart_status = status;
        self
    }

    /// Append a fallback source; it is tried after every source added before it.
    pub fn with_fallback(mut self, source: DataSourceConfig) -> Self {
        self.fallback_sources.push(source);
        self
    }

    pub fn with_freshness(mut self, freshness: FreshnessPolicy) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_required_service(mut self, service: impl Into<String>) -> Self {
        self.required_services.insert(service.into());
        self
    }

    pub fn chart_status(&self) -> ChartStatus {
        self.chart_status
    }

    pub fn category(&self) -> DataCategory {
        self.category
    }

    pub fn required_services(&self) -> &BTreeSet<String> {
        &self.required_services
    }

    pub fn primary_source(&self) -> &DataSourceConfig {
        &self.primary_source
    }

    pub fn fallback_sources(&self) -> &[DataSourceConfig] {
        &self.fallback_sources
    }

    pub fn freshness(&self) -> &FreshnessPolicy {
        &self.freshness
    }

    pub fn refresh(&self) -> &RefreshPolicy {
        &self.refresh
    }

    /// Primary source followed by the fallbacks, in failover order.
    pub fn sources(&self) -> impl Iterator<Item = &DataSourceConfig> {
        std::iter::once(&self.primary_source).chain(self.fallback_sources.iter())
    }

    /// Every service name this chart depends on: the declared required services
    /// plus those referenced by its sources.
    pub fn referenced_services(&self) -> BTreeSet<&str> {
        self.required_services
            .iter()
            .map(String::as_str)
            .chain(self.sources().filter_map(DataSourceConfig::cli_service))
            .collect()
    }
}
