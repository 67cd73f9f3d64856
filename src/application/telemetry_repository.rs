// Repository trait for telemetry data access
use crate::domain::cell::CellId;
use crate::domain::errors::StorageError;
use crate::domain::telemetry::{TelemetrySample, TelemetryStats, TimeRange};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 500;

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Append one immutable sample
    async fn append(&self, sample: &TelemetrySample) -> Result<(), StorageError>;

    /// One page of samples for a cell inside `range`, ordered by timestamp ascending
    async fn history_page(
        &self,
        cell_id: CellId,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TelemetrySample>, StorageError>;

    /// Most recent sample for a cell
    async fn latest(&self, cell_id: CellId) -> Result<Option<TelemetrySample>, StorageError>;

    /// Min/max/avg over `range`; zero-filled when the range holds no samples
    async fn aggregate(&self, cell_id: CellId, range: TimeRange) -> Result<TelemetryStats, StorageError>;
}

/// Lazily paged history of one cell. Every call to `stream` starts over from
/// the beginning of the range.
#[derive(Clone)]
pub struct TelemetryHistory {
    repository: Arc<dyn TelemetryRepository>,
    cell_id: CellId,
    range: TimeRange,
    page_size: usize,
}

impl TelemetryHistory {
    pub fn new(repository: Arc<dyn TelemetryRepository>, cell_id: CellId, range: TimeRange) -> Self {
        Self {
            repository,
            cell_id,
            range,
            page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn stream(&self) -> BoxStream<'static, Result<TelemetrySample, StorageError>> {
        let repository = self.repository.clone();
        let cell_id = self.cell_id;
        let range = self.range;
        let page_size = self.page_size;

        Box::pin(async_stream::try_stream! {
            let mut offset = 0;
            loop {
                let page = repository.history_page(cell_id, range, offset, page_size).await?;
                let fetched = page.len();
                for sample in page {
                    yield sample;
                }
                if fetched < page_size {
                    break;
                }
                offset += fetched;
            }
        })
    }
}
