//! Chart registry: chart type -> {ChartConfig, DataAdapter}.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::catalog::RegistryCatalog;
use crate::adapter::{downcast_adapter, AdapterConfig, ChartAdapter, DataAdapter};
use crate::errors::ChartDataError;
use crate::models::{
    ChartConfig, DataCategory, DataRequirements, DatasetRow, OpenPosition, PortfolioPoint,
    PriceBar, SeriesPoint, ServiceCatalog, TradeRecord,
};
use crate::source::SourceFetcher;

struct RegistryEntry {
    config: Arc<ChartConfig>,
    adapter: Option<Arc<dyn ChartAdapter>>,
}

/// Lookup table from chart type to its configuration and adapter.
///
/// Populated once at start-up through `&mut self` registration calls, then
/// shared immutably (typically behind an `Arc`). Reads need no locking.
#[derive(Default)]
pub struct ChartRegistry {
    entries: HashMap<String, RegistryEntry>,
    /// Registration order, for stable listings
    order: Vec<String>,
    dashboards: HashMap<String, Vec<String>>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a catalog, creating the typed adapter for every
    /// chart with data requirements.
    ///
    /// Every configuration problem (unknown service references, duplicate
    /// chart types or dashboards) is reported here, before any fetch.
    pub fn from_catalog(
        catalog: &RegistryCatalog,
        services: &ServiceCatalog,
        fetcher: Arc<dyn SourceFetcher>,
        config: AdapterConfig,
    ) -> Result<Self, ChartDataError> {
        let mut registry = Self::new();

        for chart in &catalog.charts {
            match &chart.requirements {
                Some(requirements) => {
                    validate_services(&chart.chart_type, requirements, services)?;
                    let adapter = build_adapter(
                        &chart.chart_type,
                        requirements.clone(),
                        Arc::clone(&fetcher),
                        config.clone(),
                    );
                    registry.register(&chart.chart_type, chart.clone(), adapter)?;
                }
                None => registry.register_config_only(chart.clone())?,
            }
        }

        for (dashboard_id, chart_types) in &catalog.dashboards {
            registry.register_dashboard(dashboard_id, chart_types.clone())?;
        }

        info!(
            "Chart registry initialized with {} charts and {} dashboards",
            registry.len(),
            registry.dashboards.len()
        );
        Ok(registry)
    }

    /// Register a chart and its adapter.
    ///
    /// Fails with [`ChartDataError::DuplicateRegistration`] if `chart_type` is
    /// already registered; the existing entry is left untouched. A config
    /// without requirements takes the adapter's; differing requirements are
    /// rejected with [`ChartDataError::InvalidConfig`].
    pub fn register(
        &mut self,
        chart_type: &str,
        mut config: ChartConfig,
        adapter: Arc<dyn ChartAdapter>,
    ) -> Result<(), ChartDataError> {
        if config.chart_type != chart_type || adapter.chart_type() != chart_type {
            return Err(ChartDataError::InvalidConfig(format!(
                "Chart type '{}' does not match config '{}' / adapter '{}'",
                chart_type,
                config.chart_type,
                adapter.chart_type()
            )));
        }
        match &config.requirements {
            Some(requirements) if requirements != adapter.requirements() => {
                return Err(ChartDataError::InvalidConfig(format!(
                    "Requirements of chart '{}' differ from its adapter's",
                    chart_type
                )));
            }
            Some(_) => {}
            None => config.requirements = Some(adapter.requirements().clone()),
        }
        self.insert(config, Some(adapter))
    }

    /// Register a chart that has no pipeline-managed data source.
    pub fn register_config_only(&mut self, config: ChartConfig) -> Result<(), ChartDataError> {
        self.insert(config, None)
    }

    /// Register a dashboard's ordered chart list.
    ///
    /// Chart types are resolved lazily, so a dashboard may reference charts
    /// that are not (yet) registered.
    pub fn register_dashboard(
        &mut self,
        dashboard_id: &str,
        chart_types: Vec<String>,
    ) -> Result<(), ChartDataError> {
        if self.dashboards.contains_key(dashboard_id) {
            return Err(ChartDataError::DuplicateRegistration(format!(
                "dashboard '{}'",
                dashboard_id
            )));
        }
        self.dashboards.insert(dashboard_id.to_string(), chart_types);
        Ok(())
    }

    fn insert(
        &mut self,
        config: ChartConfig,
        adapter: Option<Arc<dyn ChartAdapter>>,
    ) -> Result<(), ChartDataError> {
        let chart_type = config.chart_type.clone();
        if chart_type.trim().is_empty() {
            return Err(ChartDataError::InvalidConfig(
                "Chart type must not be empty".to_string(),
            ));
        }
        if self.entries.contains_key(&chart_type) {
            return Err(ChartDataError::DuplicateRegistration(chart_type));
        }

        debug!(
            "Registered chart '{}' ({})",
            chart_type,
            if adapter.is_some() {
                "with adapter"
            } else {
                "config only"
            }
        );
        self.entries.insert(
            chart_type.clone(),
            RegistryEntry {
                config: Arc::new(config),
                adapter,
            },
        );
        self.order.push(chart_type);
        Ok(())
    }

    pub fn get_chart_config(&self, chart_type: &str) -> Option<Arc<ChartConfig>> {
        self.entries
            .get(chart_type)
            .map(|entry| Arc::clone(&entry.config))
    }

    pub fn is_supported(&self, chart_type: &str) -> bool {
        self.entries.contains_key(chart_type)
    }

    /// Unregistered chart types are never production ready.
    pub fn is_production_ready(&self, chart_type: &str) -> bool {
        self.entries
            .get(chart_type)
            .is_some_and(|entry| entry.config.production_ready)
    }

    /// Resolve a dashboard to its charts, in declared order.
    ///
    /// Unregistered chart types are skipped with a warning each; an unknown
    /// dashboard yields an empty list.
    pub fn get_charts_for_dashboard(&self, dashboard_id: &str) -> Vec<Arc<ChartConfig>> {
        let Some(chart_types) = self.dashboards.get(dashboard_id) else {
            warn!("Unknown dashboard '{}'", dashboard_id);
            return Vec::new();
        };

        chart_types
            .iter()
            .filter_map(|chart_type| {
                let config = self.get_chart_config(chart_type);
                if config.is_none() {
                    warn!(
                        "Dashboard '{}' references unregistered chart type '{}', omitting",
                        dashboard_id, chart_type
                    );
                }
                config
            })
            .collect()
    }

    /// All registered chart types in registration order.
    pub fn chart_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn dashboard_ids(&self) -> impl Iterator<Item = &str> {
        self.dashboards.keys().map(String::as_str)
    }

    /// The chart types a dashboard declares, registered or not.
    pub fn dashboard_chart_types(&self, dashboard_id: &str) -> Option<&[String]> {
        self.dashboards.get(dashboard_id).map(Vec::as_slice)
    }

    pub fn production_ready_charts(&self) -> Vec<Arc<ChartConfig>> {
        self.configs_where(|config| config.production_ready)
    }

    /// Charts whose data requirements belong to `category`.
    pub fn charts_by_category(&self, category: DataCategory) -> Vec<Arc<ChartConfig>> {
        self.configs_where(|config| {
            config
                .requirements
                .as_ref()
                .is_some_and(|r| r.category() == category)
        })
    }

    fn configs_where(&self, predicate: impl Fn(&ChartConfig) -> bool) -> Vec<Arc<ChartConfig>> {
        self.order
            .iter()
            .filter_map(|chart_type| self.entries.get(chart_type))
            .filter(|entry| predicate(&entry.config))
            .map(|entry| Arc::clone(&entry.config))
            .collect()
    }

    /// The adapter for a chart type, if the chart has one.
    pub fn adapter(&self, chart_type: &str) -> Option<Arc<dyn ChartAdapter>> {
        self.entries
            .get(chart_type)
            .and_then(|entry| entry.adapter.clone())
    }

    /// The typed adapter for a chart type, if its row type is `R`.
    pub fn typed_adapter<R: DatasetRow>(&self, chart_type: &str) -> Option<DataAdapter<R>> {
        let adapter = self.entries.get(chart_type)?.adapter.as_ref()?;
        downcast_adapter::<R>(adapter).cloned()
    }

    /// Fetch a chart's rows as a JSON array. This is the call rendering
    /// consumers make; they never see source configuration.
    ///
    /// # Errors
    ///
    /// - [`ChartDataError::UnknownChartType`] if the chart is not registered
    /// - [`ChartDataError::NoDataSource`] if it has no adapter
    /// - Any adapter error (e.g. [`ChartDataError::DataUnavailable`])
    pub async fn fetch_data(
        &self,
        chart_type: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ChartDataError> {
        let adapter = self.require_adapter(chart_type)?;
        adapter.fetch_json(cancel).await
    }

    /// Fetch a chart's rows as CSV.
    pub async fn fetch_csv(
        &self,
        chart_type: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ChartDataError> {
        let adapter = self.require_adapter(chart_type)?;
        adapter.fetch_csv(cancel).await
    }

    fn require_adapter(&self, chart_type: &str) -> Result<Arc<dyn ChartAdapter>, ChartDataError> {
        let entry = self
            .entries
            .get(chart_type)
            .ok_or_else(|| ChartDataError::UnknownChartType(chart_type.to_string()))?;
        entry
            .adapter
            .clone()
            .ok_or_else(|| ChartDataError::NoDataSource(chart_type.to_string()))
    }

    /// Start background refreshers for every chart with `auto_refresh` set.
    pub fn spawn_auto_refresh(
        &self,
        shutdown: &CancellationToken,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        self.order
            .iter()
            .filter_map(|chart_type| self.entries.get(chart_type)?.adapter.as_ref())
            .filter_map(|adapter| adapter.spawn_auto_refresh(shutdown.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRegistry")
            .field("charts", &self.order)
            .field("dashboards", &self.dashboards.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Every service a chart references must exist in the service table.
fn validate_services(
    chart_type: &str,
    requirements: &DataRequirements,
    services: &ServiceCatalog,
) -> Result<(), ChartDataError> {
    for name in requirements.referenced_services() {
        if !services.contains(name) {
            return Err(ChartDataError::InvalidConfig(format!(
                "Chart '{}' references unknown CLI service '{}'",
                chart_type, name
            )));
        }
    }
    Ok(())
}

/// Create the adapter whose row type matches the data category.
fn build_adapter(
    chart_type: &str,
    requirements: DataRequirements,
    fetcher: Arc<dyn SourceFetcher>,
    config: AdapterConfig,
) -> Arc<dyn ChartAdapter> {
    match requirements.category() {
        DataCategory::Raw => typed::<PriceBar>(chart_type, requirements, fetcher, config),
        DataCategory::Portfolio => {
            typed::<PortfolioPoint>(chart_type, requirements, fetcher, config)
        }
        DataCategory::TradeHistory => {
            typed::<TradeRecord>(chart_type, requirements, fetcher, config)
        }
        DataCategory::OpenPositions => {
            typed::<OpenPosition>(chart_type, requirements, fetcher, config)
        }
        DataCategory::Processed => typed::<SeriesPoint>(chart_type, requirements, fetcher, config),
    }
}

fn typed<R: DatasetRow>(
    chart_type: &str,
    requirements: DataRequirements,
    fetcher: Arc<dyn SourceFetcher>,
    config: AdapterConfig,
) -> Arc<dyn ChartAdapter> {
    Arc::new(DataAdapter::<R>::with_config(
        chart_type,
        requirements,
        fetcher,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::{DataSourceConfig, Frequency, RefreshMethod};

    struct NoopFetcher;

    #[async_trait]
    impl SourceFetcher for NoopFetcher {
        async fn fetch(&self, source: &DataSourceConfig) -> Result<Vec<u8>, ChartDataError> {
            Err(ChartDataError::Io {
                location: source.location().to_string(),
                message: "unavailable".to_string(),
            })
        }
    }

    fn requirements(category: DataCategory) -> DataRequirements {
        DataRequirements::new(
            category,
            DataSourceConfig::file("x.csv", RefreshMethod::FileWatch, Frequency::Daily).unwrap(),
        )
    }

    fn adapter(chart_type: &str, category: DataCategory) -> Arc<dyn ChartAdapter> {
        build_adapter(
            chart_type,
            requirements(category),
            Arc::new(NoopFetcher),
            AdapterConfig::default(),
        )
    }

    fn config(chart_type: &str) -> ChartConfig {
        ChartConfig::new(chart_type, chart_type.to_uppercase(), "Test")
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut registry = ChartRegistry::new();
        registry
            .register(
                "btc-price",
                config("btc-price").with_production_ready(true),
                adapter("btc-price", DataCategory::Raw),
            )
            .unwrap();

        let result = registry.register(
            "btc-price",
            config("btc-price").with_description("replacement"),
            adapter("btc-price", DataCategory::Raw),
        );

        assert!(matches!(result, Err(ChartDataError::DuplicateRegistration(ref t)) if t == "btc-price"));
        let kept = registry.get_chart_config("btc-price").unwrap();
        assert!(kept.production_ready);
        assert!(kept.description.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_mismatched_chart_type_rejected() {
        let mut registry = ChartRegistry::new();
        let result = registry.register(
            "btc-price",
            config("eth-price"),
            adapter("btc-price", DataCategory::Raw),
        );
        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bare_config_takes_adapter_requirements() {
        let mut registry = ChartRegistry::new();
        registry
            .register("btc-price", config("btc-price"), adapter("btc-price", DataCategory::Raw))
            .unwrap();

        let stored = registry.get_chart_config("btc-price").unwrap();
        assert_eq!(stored.requirements, Some(requirements(DataCategory::Raw)));
        assert_eq!(registry.charts_by_category(DataCategory::Raw).len(), 1);
    }

    #[test]
    fn test_conflicting_requirements_rejected() {
        let mut registry = ChartRegistry::new();
        let result = registry.register(
            "btc-price",
            config("btc-price").with_requirements(requirements(DataCategory::Portfolio)),
            adapter("btc-price", DataCategory::Raw),
        );

        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_production_ready_absent_is_false() {
        let mut registry = ChartRegistry::new();
        registry
            .register_config_only(config("notes").with_production_ready(true))
            .unwrap();

        assert!(registry.is_production_ready("notes"));
        assert!(!registry.is_production_ready("missing"));
        assert!(registry.is_supported("notes"));
        assert!(!registry.is_supported("missing"));
    }

    #[test]
    fn test_unknown_dashboard_is_empty() {
        let registry = ChartRegistry::new();
        assert!(registry.get_charts_for_dashboard("nope").is_empty());
    }

    #[test]
    fn test_duplicate_dashboard_rejected() {
        let mut registry = ChartRegistry::new();
        registry.register_dashboard("main", vec![]).unwrap();
        let result = registry.register_dashboard("main", vec!["a".to_string()]);
        assert!(matches!(result, Err(ChartDataError::DuplicateRegistration(_))));
    }

    #[test]
    fn test_listing_helpers() {
        let mut registry = ChartRegistry::new();
        registry
            .register(
                "equity",
                config("equity").with_requirements(requirements(DataCategory::Portfolio)),
                adapter("equity", DataCategory::Portfolio),
            )
            .unwrap();
        registry
            .register(
                "trades",
                config("trades")
                    .with_production_ready(true)
                    .with_requirements(requirements(DataCategory::TradeHistory)),
                adapter("trades", DataCategory::TradeHistory),
            )
            .unwrap();
        registry.register_config_only(config("notes")).unwrap();

        assert_eq!(
            registry.chart_types().collect::<Vec<_>>(),
            vec!["equity", "trades", "notes"]
        );
        assert_eq!(registry.production_ready_charts().len(), 1);
        assert_eq!(
            registry.charts_by_category(DataCategory::Portfolio)[0].chart_type,
            "equity"
        );
        assert!(registry.typed_adapter::<PortfolioPoint>("equity").is_some());
        assert!(registry.typed_adapter::<PriceBar>("equity").is_none());
        assert!(registry.adapter("notes").is_none());
    }

    #[tokio::test]
    async fn test_fetch_data_errors() {
        let mut registry = ChartRegistry::new();
        registry.register_config_only(config("notes")).unwrap();

        let unknown = registry.fetch_data("missing", None).await;
        assert!(matches!(unknown, Err(ChartDataError::UnknownChartType(_))));

        let no_source = registry.fetch_data("notes", None).await;
        assert!(matches!(no_source, Err(ChartDataError::NoDataSource(_))));
    }

    #[test]
    fn test_from_catalog_rejects_unknown_service() {
        let catalog = RegistryCatalog::from_toml_str(
            r#"
            [[charts]]
            chart_type = "btc-price"
            title = "BTC"
            category = "Market"

            [charts.requirements]
            category = "raw"

            [charts.requirements.primary_source]
            source_type = "cli-api"
            location = "btc.csv"
            refresh_method = "api-poll"
            frequency = "daily"
            cli_service = "missing"
            "#,
        )
        .unwrap();

        let result = ChartRegistry::from_catalog(
            &catalog,
            &ServiceCatalog::new(),
            Arc::new(NoopFetcher),
            AdapterConfig::default(),
        );
        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
    }
}
