//! Chart registry and its catalog.
//!
//! - [`ChartRegistry`] maps chart types to configuration and adapters and
//!   resolves dashboards
//! - [`RegistryCatalog`] is the TOML description the registry is built from

mod catalog;
mod chart_registry;

pub use catalog::RegistryCatalog;
pub use chart_registry::ChartRegistry;
