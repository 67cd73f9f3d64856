// Repository trait for cell records
use crate::domain::cell::{Cell, CellId};
use crate::domain::errors::StorageError;
use async_trait::async_trait;

#[async_trait]
pub trait CellRepository: Send + Sync {
    async fn find(&self, cell_id: CellId) -> Result<Option<Cell>, StorageError>;

    /// Active cells sorted by id
    async fn list_active(&self) -> Result<Vec<Cell>, StorageError>;

    /// Store a new cell. Returns false when the id is already taken.
    async fn insert(&self, cell: Cell) -> Result<bool, StorageError>;

    /// Overwrite the aggregate fields of an active cell as one atomic update.
    /// Returns `None` when no active cell has this id.
    async fn apply_reading(
        &self,
        cell_id: CellId,
        voltage: f64,
        temperature: f64,
        cycle_count: Option<i64>,
    ) -> Result<Option<Cell>, StorageError>;

    /// Soft delete. Returns `None` when the id is unknown.
    async fn retire(&self, cell_id: CellId) -> Result<Option<Cell>, StorageError>;
}
