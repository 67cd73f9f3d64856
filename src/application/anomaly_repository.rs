// Repository trait for anomaly records
use crate::domain::anomaly::{Anomaly, AnomalyFilter, AnomalyId};
use crate::domain::errors::StorageError;
use async_trait::async_trait;

#[async_trait]
pub trait AnomalyRepository: Send + Sync {
    async fn insert(&self, anomaly: &Anomaly) -> Result<(), StorageError>;

    async fn find(&self, id: AnomalyId) -> Result<Option<Anomaly>, StorageError>;

    /// Matching anomalies newest first, paged by `filter.skip`/`filter.limit`,
    /// plus the total number of matches before paging
    async fn list(&self, filter: &AnomalyFilter) -> Result<(Vec<Anomaly>, usize), StorageError>;

    /// The only mutation an anomaly allows
    async fn set_resolved(&self, id: AnomalyId, resolved: bool) -> Result<Option<Anomaly>, StorageError>;
}
