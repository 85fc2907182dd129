use async_trait::async_trait;

use crate::errors::ChartDataError;
use crate::models::DataSourceConfig;

/// Retrieves the raw payload for a data source.
///
/// Implementations perform the I/O only. They must not retry: retries and
/// failover are driven by the adapter according to the chart's refresh policy.
///
/// Dropping the returned future must abort the underlying work where the
/// platform allows it (child processes are killed, reads are abandoned).
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the payload for `source`.
    ///
    /// # Arguments
    ///
    /// * `source` - The source to read (file location or CLI service)
    ///
    /// # Returns
    ///
    /// The raw bytes, in the format declared by `source.format()`.
    async fn fetch(&self, source: &DataSourceConfig) -> Result<Vec<u8>, ChartDataError>;
}
