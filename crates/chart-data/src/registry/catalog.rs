//! Registry catalog: the static description of services, charts and dashboards.
//!
//! ```toml
//! [services.btc-prices]
//! command = "python3"
//! args = ["scripts/export_btc.py", "--format", "csv"]
//! timeout_seconds = 30
//!
//! [[charts]]
//! chart_type = "btc-price"
//! title = "Bitcoin Price"
//! category = "Market Data"
//! production_ready = true
//!
//! [charts.requirements]
//! category = "raw"
//! required_services = ["btc-prices"]
//!
//! [charts.requirements.primary_source]
//! source_type = "cli-api"
//! location = "btc_price.csv"
//! refresh_method = "api-poll"
//! frequency = "daily"
//! cli_service = "btc-prices"
//!
//! [dashboards]
//! markets = ["btc-price"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::errors::ChartDataError;
use crate::models::{ChartConfig, CliServiceSpec, ServiceCatalog};

/// Parsed catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryCatalog {
    #[serde(default)]
    pub services: BTreeMap<String, CliServiceSpec>,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub dashboards: BTreeMap<String, Vec<String>>,
}

impl RegistryCatalog {
    /// Parse a catalog from TOML. Value-object invariants are checked here.
    pub fn from_toml_str(text: &str) -> Result<Self, ChartDataError> {
        toml::from_str(text).map_err(|e| ChartDataError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a catalog file.
    pub fn load(path: &Path) -> Result<Self, ChartDataError> {
        debug!("Loading chart catalog from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| ChartDataError::Io {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            ChartDataError::InvalidConfig(message) => {
                ChartDataError::InvalidConfig(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Validated CLI service table.
    pub fn service_catalog(&self) -> Result<ServiceCatalog, ChartDataError> {
        let mut catalog = ServiceCatalog::new();
        for (name, spec) in &self.services {
            catalog.insert(spec.clone().into_config(name)?)?;
        }
        Ok(catalog)
    }

    /// Mark the listed charts production ready, regardless of the catalog flag.
    ///
    /// Unknown chart types are returned so the caller can report them.
    pub fn apply_production_overrides<'a>(
        &mut self,
        chart_types: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let wanted: BTreeSet<&str> = chart_types.into_iter().collect();
        let mut unknown: BTreeSet<&str> = wanted.clone();

        for chart in &mut self.charts {
            if wanted.contains(chart.chart_type.as_str()) {
                chart.production_ready = true;
                unknown.remove(chart.chart_type.as_str());
            }
        }

        unknown.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataCategory, SourceType};

    const CATALOG: &str = r#"
        [services.btc-prices]
        command = "python3"
        args = ["export_btc.py"]
        timeout_seconds = 30

        [[charts]]
        chart_type = "btc-price"
        title = "Bitcoin Price"
        category = "Market Data"

        [charts.requirements]
        category = "raw"
        required_services = ["btc-prices"]

        [charts.requirements.primary_source]
        source_type = "cli-api"
        location = "btc_price.csv"
        refresh_method = "api-poll"
        frequency = "daily"
        cli_service = "btc-prices"

        [[charts.requirements.fallback_sources]]
        source_type = "manual"
        location = "snapshots/btc_price.csv"
        refresh_method = "manual-update"
        frequency = "weekly"

        [[charts]]
        chart_type = "market-notes"
        title = "Market Notes"
        category = "Commentary"

        [dashboards]
        markets = ["btc-price", "market-notes"]
    "#;

    #[test]
    fn test_parse_catalog() {
        let catalog = RegistryCatalog::from_toml_str(CATALOG).unwrap();

        assert_eq!(catalog.charts.len(), 2);
        assert_eq!(catalog.dashboards["markets"].len(), 2);

        let requirements = catalog.charts[0].requirements.as_ref().unwrap();
        assert_eq!(requirements.category(), DataCategory::Raw);
        assert_eq!(requirements.primary_source().source_type(), SourceType::CliApi);
        assert_eq!(requirements.fallback_sources().len(), 1);
        assert!(catalog.charts[1].requirements.is_none());

        let services = catalog.service_catalog().unwrap();
        assert_eq!(services.get("btc-prices").unwrap().timeout_seconds(), 30);
    }

    #[test]
    fn test_invalid_policy_fails_at_load() {
        let text = r#"
            [[charts]]
            chart_type = "x"
            title = "X"
            category = "Y"

            [charts.requirements]
            category = "processed"

            [charts.requirements.primary_source]
            source_type = "file-watch"
            location = "x.csv"
            refresh_method = "file-watch"
            frequency = "daily"

            [charts.requirements.freshness]
            warning_threshold_hours = 48.0
            error_threshold_hours = 24.0
        "#;

        let result = RegistryCatalog::from_toml_str(text);
        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
    }

    #[test]
    fn test_misspelled_nested_keys_fail_at_load() {
        let base = r#"
            [[charts]]
            chart_type = "x"
            title = "X"
            category = "Y"

            [charts.requirements]
            category = "processed"

            [charts.requirements.primary_source]
            source_type = "file-watch"
            location = "x.csv"
            refresh_method = "file-watch"
            frequency = "daily"
        "#;
        let typos = [
            "[charts.requirements.freshness]\nwarning_threshold_hours = 24.0\nerror_threshold_hours = 48.0\nblok_on_stale = true\n",
            "[charts.requirements.refresh]\nmax_retrys = 9\n",
        ];

        for typo in typos {
            let text = format!("{}\n{}", base, typo);
            let result = RegistryCatalog::from_toml_str(&text);
            match result {
                Err(ChartDataError::InvalidConfig(message)) => {
                    assert!(message.contains("unknown field"), "{message}")
                }
                other => panic!("expected InvalidConfig for {typo:?}, got {other:?}"),
            }
        }

        let with_bad_source_key = base.replace(
            "frequency = \"daily\"",
            "frequency = \"daily\"\n            fallback = \"x.json\"",
        );
        assert!(matches!(
            RegistryCatalog::from_toml_str(&with_bad_source_key),
            Err(ChartDataError::InvalidConfig(_))
        ));

        let with_bad_requirements_key =
            base.replace("category = \"processed\"", "category = \"processed\"\nfallback_source = []");
        assert!(matches!(
            RegistryCatalog::from_toml_str(&with_bad_requirements_key),
            Err(ChartDataError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_misspelled_service_key_fails_at_load() {
        let text = r#"
            [services.btc-prices]
            command = "python3"
            timeout_secs = 30
        "#;

        let result = RegistryCatalog::from_toml_str(text);
        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
    }

    #[test]
    fn test_production_overrides() {
        let mut catalog = RegistryCatalog::from_toml_str(CATALOG).unwrap();
        let unknown = catalog.apply_production_overrides(["market-notes", "nope"]);

        assert_eq!(unknown, vec!["nope".to_string()]);
        assert!(catalog.charts[1].production_ready);
        assert!(!catalog.charts[0].production_ready);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = RegistryCatalog::load(Path::new("/nonexistent/charts.toml"));
        assert!(matches!(result, Err(ChartDataError::Io { .. })));
    }
}
