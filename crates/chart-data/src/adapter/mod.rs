//! Per-chart data adapters.
//!
//! - [`DataAdapter`] fetches, parses and caches the rows for one chart type
//! - [`ChartAdapter`] is the row-type independent face the registry stores
//! - [`FetchDiagnostics`] records every source attempt of a fetch
//! - [`spawn_auto_refresh`] keeps a cache warm on a timer when enabled

mod auto_refresh;
mod cache;
mod data_adapter;
mod diagnostics;
mod erased;

pub use auto_refresh::spawn_auto_refresh;
pub use cache::{CacheStatus, CachedDataset};
pub use data_adapter::{AdapterConfig, DataAdapter, FetchReport, DEFAULT_CACHE_DURATION};
pub use diagnostics::{AttemptOutcome, FetchAttempt, FetchDiagnostics};
pub use erased::{downcast_adapter, ChartAdapter};
