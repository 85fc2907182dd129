use std::sync::Arc;

use anyhow::Context;
use chartdeck_data::{AdapterConfig, ChartRegistry, RegistryCatalog, SystemFetcher};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Cli;

/// Install the global subscriber. `CHARTDECK_LOG_FORMAT=json` switches to JSON
/// lines; `RUST_LOG` controls the filter. Logs go to stderr so stdout carries
/// only data.
pub fn init_tracing() {
    let log_format = std::env::var("CHARTDECK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the catalog and build the registry. Any configuration error aborts
/// start-up.
pub fn build_registry(cli: &Cli) -> anyhow::Result<ChartRegistry> {
    let mut catalog = RegistryCatalog::load(&cli.catalog)
        .with_context(|| format!("Failed to load catalog {}", cli.catalog.display()))?;

    if !cli.production_ready.is_empty() {
        let unknown = catalog.apply_production_overrides(
            cli.production_ready
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty()),
        );
        for chart_type in unknown {
            tracing::warn!(
                "CHARTDECK_PRODUCTION_READY names unknown chart type '{}'",
                chart_type
            );
        }
    }

    let services = Arc::new(catalog.service_catalog()?);
    let data_root = cli.data_root();
    tracing::info!("Data root in use: {}", data_root.display());

    let fetcher = Arc::new(SystemFetcher::new(data_root, Arc::clone(&services)));
    let config = AdapterConfig::default().with_cache_duration(cli.cache_duration());

    Ok(ChartRegistry::from_catalog(
        &catalog, &services, fetcher, config,
    )?)
}
