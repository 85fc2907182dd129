//! Chart data models
//!
//! This module contains the configuration value objects and row types:
//! - `source` - Where and how a dataset is obtained (DataSourceConfig)
//! - `policy` - Staleness thresholds and retry/refresh behaviour
//! - `requirements` - Primary/fallback sources plus policies for one chart
//! - `chart` - Display metadata (ChartConfig)
//! - `service` - CLI services that produce datasets (CliServiceConfig, ServiceCatalog)
//! - `rows` - Typed dataset rows per data category

mod chart;
mod policy;
mod requirements;
pub mod rows;
mod service;
mod source;

pub use chart::ChartConfig;
pub use policy::{
    FreshnessPolicy, FreshnessPolicySpec, RefreshPolicy, RefreshPolicySpec, RetryBackoff,
};
pub use requirements::{ChartStatus, DataCategory, DataRequirements};
pub use rows::{DatasetRow, OpenPosition, PortfolioPoint, PriceBar, SeriesPoint, TradeRecord};
pub use service::{CliServiceConfig, CliServiceSpec, ServiceCatalog};
pub use source::{DataFormat, DataSourceConfig, DataSourceSpec, Frequency, RefreshMethod, SourceType};
