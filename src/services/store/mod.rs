//! Destination store abstraction.
//!
//! The sink drives a store through explicit transaction steps so that the
//! rollback policy lives in one place regardless of backend.

mod memory;
mod pgvector;

pub use memory::MemoryStore;
pub use pgvector::PgVectorStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{EmbeddingResult, StoreConfig};

/// One row of the destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub content: String,
    pub embedding: Vec<f32>,
}

impl From<EmbeddingResult> for StoredRow {
    fn from(result: EmbeddingResult) -> Self {
        Self {
            content: result.text,
            embedding: result.vector,
        }
    }
}

/// A single owned connection to the destination store.
#[async_trait]
pub trait RecordStore: Send {
    async fn begin(&mut self) -> Result<(), StoreError>;

    /// Insert one row inside the open transaction.
    async fn insert(&mut self, row: &StoredRow) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard the open transaction, if any.
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// Number of committed rows in the target table.
    async fn count_rows(&mut self) -> Result<u64, StoreError>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Opens one store connection per sink worker.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RecordStore>, StoreError>;
}

#[async_trait]
impl StoreProvider for StoreConfig {
    async fn open(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        let store = PgVectorStore::connect(self).await?;
        Ok(Box::new(store))
    }
}

#[async_trait]
impl StoreProvider for MemoryStore {
    async fn open(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        Ok(Box::new(self.connection()))
    }
}
