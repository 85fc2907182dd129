use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ChartDataError;

/// Default CLI service timeout.
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// An external command that writes a dataset to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliServiceConfig {
    name: String,
    command: String,
    args: Vec<String>,
    timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_dir: Option<PathBuf>,
}

impl CliServiceConfig {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        timeout_seconds: u64,
    ) -> Result<Self, ChartDataError> {
        let name = name.into();
        let command = command.into();

        if name.trim().is_empty() {
            return Err(ChartDataError::InvalidConfig(
                "CLI service name must not be empty".to_string(),
            ));
        }
        if command.trim().is_empty() {
            return Err(ChartDataError::InvalidConfig(format!(
                "CLI service '{}' has an empty command",
                name
            )));
        }
        if timeout_seconds == 0 {
            return Err(ChartDataError::InvalidConfig(format!(
                "CLI service '{}' must have a timeout greater than zero",
                name
            )));
        }

        Ok(Self {
            name,
            command,
            args,
            timeout_seconds,
            working_dir: None,
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }
}

/// A service entry as written in a catalog, keyed by service name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliServiceSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl CliServiceSpec {
    pub fn into_config(self, name: &str) -> Result<CliServiceConfig, ChartDataError> {
        let config = CliServiceConfig::new(name, self.command, self.args, self.timeout_seconds)?;
        Ok(match self.working_dir {
            Some(dir) => config.with_working_dir(dir),
            None => config,
        })
    }
}

/// Lookup table of CLI services by name.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: BTreeMap<String, CliServiceConfig>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service. Names must be unique.
    pub fn insert(&mut self, service: CliServiceConfig) -> Result<(), ChartDataError> {
        if self.services.contains_key(service.name()) {
            return Err(ChartDataError::DuplicateRegistration(format!(
                "service '{}'",
                service.name()
            )));
        }
        self.services.insert(service.name().to_string(), service);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CliServiceConfig> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_rejected() {
        let result = CliServiceConfig::new("btc-cli", "python3", vec![], 0);
        assert!(matches!(result, Err(ChartDataError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = CliServiceConfig::new("btc-cli", " ", vec![], 10);
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_rejects_duplicate_names() {
        let mut catalog = ServiceCatalog::new();
        let service = CliServiceConfig::new("btc-cli", "python3", vec![], 10).unwrap();

        catalog.insert(service.clone()).unwrap();
        let result = catalog.insert(service);

        assert!(matches!(
            result,
            Err(ChartDataError::DuplicateRegistration(_))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_spec_applies_default_timeout() {
        let spec: CliServiceSpec = toml::from_str(r#"command = "python3""#).unwrap();
        let config = spec.into_config("btc-cli").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
        assert_eq!(config.name(), "btc-cli");
    }
}
