//! Source fetchers.
//!
//! A [`SourceFetcher`] turns one [`DataSourceConfig`](crate::models::DataSourceConfig)
//! into raw payload bytes. Parsing happens later, in the adapter.
//!
//! - [`SystemFetcher`] reads files under a data root and runs CLI services
//! - [`run_service`] invokes a single CLI service with its timeout

mod cli;
mod system;
mod traits;

pub use cli::run_service;
pub use system::SystemFetcher;
pub use traits::SourceFetcher;
