//! Filesystem and subprocess backed fetcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::cli::run_service;
use super::traits::SourceFetcher;
use crate::errors::ChartDataError;
use crate::models::{DataSourceConfig, ServiceCatalog, SourceType};

/// Fetches payloads from disk and from configured CLI services.
///
/// | Source type  | Behaviour                                              |
/// |--------------|--------------------------------------------------------|
/// | `cli-api`    | Run the referenced service and capture stdout          |
/// | `manual`     | Read `location` under the data root                    |
/// | `file-watch` | Read `location` under the data root                    |
/// | `hybrid`     | Run the service if one is referenced, else read the file; a failed service run falls back to the file |
#[derive(Debug, Clone)]
pub struct SystemFetcher {
    data_root: PathBuf,
    services: Arc<ServiceCatalog>,
}

impl SystemFetcher {
    pub fn new(data_root: impl Into<PathBuf>, services: Arc<ServiceCatalog>) -> Self {
        Self {
            data_root: data_root.into(),
            services,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn services(&self) -> &ServiceCatalog {
        &self.services
    }

    /// Resolve a source location against the data root. Absolute locations
    /// are used as-is.
    pub fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root.join(path)
        }
    }

    async fn read_file(&self, source: &DataSourceConfig) -> Result<Vec<u8>, ChartDataError> {
        let path = self.resolve(source.location());
        debug!("Reading dataset file {}", path.display());

        tokio::fs::read(&path)
            .await
            .map_err(|e| ChartDataError::Io {
                location: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn run_named_service(&self, name: &str) -> Result<Vec<u8>, ChartDataError> {
        let service = self
            .services
            .get(name)
            .ok_or_else(|| ChartDataError::ServiceNotFound(name.to_string()))?;
        run_service(service).await
    }
}

#[async_trait]
impl SourceFetcher for SystemFetcher {
    async fn fetch(&self, source: &DataSourceConfig) -> Result<Vec<u8>, ChartDataError> {
        match source.source_type() {
            SourceType::CliApi => match source.cli_service() {
                Some(name) => self.run_named_service(name).await,
                None => Err(ChartDataError::InvalidConfig(format!(
                    "cli-api source '{}' has no CLI service",
                    source.location()
                ))),
            },
            SourceType::Manual | SourceType::FileWatch => self.read_file(source).await,
            SourceType::Hybrid => {
                let Some(name) = source.cli_service() else {
                    return self.read_file(source).await;
                };
                match self.run_named_service(name).await {
                    Ok(payload) => Ok(payload),
                    Err(e) => {
                        warn!(
                            "Hybrid source '{}': service '{}' failed ({}), reading file instead",
                            source.location(),
                            name,
                            e
                        );
                        self.read_file(source).await
                    }
                }
            }
        }
    }
}
