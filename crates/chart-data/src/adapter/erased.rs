//! Row-type independent adapter interface used by the registry.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::auto_refresh::spawn_auto_refresh;
use super::cache::CacheStatus;
use super::data_adapter::DataAdapter;
use super::diagnostics::FetchDiagnostics;
use crate::errors::ChartDataError;
use crate::models::{DataRequirements, DatasetRow};
use crate::parse::write_csv;

/// A chart's adapter with its row type erased.
///
/// The registry stores adapters for different row types side by side; this
/// trait is what rendering consumers call through. Use
/// [`as_any`](ChartAdapter::as_any) to recover the typed [`DataAdapter`].
#[async_trait]
pub trait ChartAdapter: Send + Sync {
    fn chart_type(&self) -> &str;

    fn requirements(&self) -> &DataRequirements;

    /// Fetch the rows as a JSON array of objects.
    async fn fetch_json(&self, cancel: Option<&CancellationToken>) -> Result<Value, ChartDataError>;

    /// Fetch the rows as CSV with a header row.
    async fn fetch_csv(&self, cancel: Option<&CancellationToken>) -> Result<String, ChartDataError>;

    /// Force a manual refresh and return the attempt trail.
    async fn refresh(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchDiagnostics, ChartDataError>;

    fn invalidate(&self);

    fn cache_status(&self) -> Option<CacheStatus>;

    fn spawn_auto_refresh(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<R: DatasetRow> ChartAdapter for DataAdapter<R> {
    fn chart_type(&self) -> &str {
        DataAdapter::chart_type(self)
    }

    fn requirements(&self) -> &DataRequirements {
        DataAdapter::requirements(self)
    }

    async fn fetch_json(&self, cancel: Option<&CancellationToken>) -> Result<Value, ChartDataError> {
        let dataset = self.fetch_data(cancel).await?;
        serde_json::to_value(&dataset.rows).map_err(|e| ChartDataError::ParseError {
            location: dataset.source.clone(),
            message: e.to_string(),
        })
    }

    async fn fetch_csv(&self, cancel: Option<&CancellationToken>) -> Result<String, ChartDataError> {
        let dataset = self.fetch_data(cancel).await?;
        write_csv(&dataset.rows)
    }

    async fn refresh(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<FetchDiagnostics, ChartDataError> {
        DataAdapter::refresh(self, cancel)
            .await
            .map(|report| report.diagnostics)
    }

    fn invalidate(&self) {
        DataAdapter::invalidate(self)
    }

    fn cache_status(&self) -> Option<CacheStatus> {
        DataAdapter::cache_status(self)
    }

    fn spawn_auto_refresh(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        spawn_auto_refresh(self.clone(), shutdown)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Downcast an erased adapter to its typed form.
pub fn downcast_adapter<R: DatasetRow>(adapter: &Arc<dyn ChartAdapter>) -> Option<&DataAdapter<R>> {
    adapter.as_any().downcast_ref::<DataAdapter<R>>()
}
