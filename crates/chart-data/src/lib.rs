//! Chartdeck Chart Data Crate
//!
//! This crate maps chart identifiers to their data requirements and serves
//! cached, validated rows to rendering components.
//!
//! # Overview
//!
//! The chart data crate supports:
//! - Declarative data sources: CLI services, manually updated files, watched files
//! - Primary + ordered fallback sources with per-source retry and backoff
//! - Freshness classification and blocking of stale data
//! - In-memory TTL caching with coalesced concurrent fetches
//! - Dashboard-to-chart resolution
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  ChartRegistry   |  (chart type -> config + adapter)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |   DataAdapter    | --> |  CachedDataset   |  (atomic snapshot, TTL)
//! +------------------+     +------------------+
//!          |  miss / stale / blocked
//!          v
//! +------------------+
//! |  SourceFetcher   |  (primary, then fallbacks, retried per RefreshPolicy)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   parse_rows     |  (CSV / JSON -> validated typed rows)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`ChartRegistry`] - Lookup from chart type to configuration and adapter
//! - [`DataAdapter`] - Fetches, parses and caches one chart's rows
//! - [`DataRequirements`] - Sources and policies for one chart
//! - [`DataSourceConfig`] - One place a dataset can be obtained from
//! - [`FreshnessPolicy`] / [`RefreshPolicy`] - Staleness and retry behaviour
//! - [`ChartDataError`] - Error type with retry classification

pub mod adapter;
pub mod clock;
pub mod errors;
pub mod freshness;
pub mod models;
pub mod parse;
pub mod registry;
pub mod source;

// Re-export model types
pub use models::{
    ChartConfig, ChartStatus, CliServiceConfig, CliServiceSpec, DataCategory, DataFormat,
    DataRequirements, DataSourceConfig, DataSourceSpec, DatasetRow, Frequency, FreshnessPolicy,
    OpenPosition, PortfolioPoint, PriceBar, RefreshMethod, RefreshPolicy, RetryBackoff,
    SeriesPoint, ServiceCatalog, SourceType, TradeRecord,
};

// Re-export adapter types
pub use adapter::{
    spawn_auto_refresh, AdapterConfig, AttemptOutcome, CacheStatus, CachedDataset, ChartAdapter,
    DataAdapter, FetchAttempt, FetchDiagnostics, FetchReport,
};

// Re-export registry types
pub use registry::{ChartRegistry, RegistryCatalog};

// Re-export source types
pub use source::{run_service, SourceFetcher, SystemFetcher};

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{ChartDataError, RetryClass};
pub use freshness::{classify, Freshness};
pub use parse::{parse_rows, write_csv};
