use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::models::EmbeddingResult;
use crate::services::store::{RecordStore, StoredRow};

/// Persists embedding results one transaction per record.
pub struct Sink {
    store: Box<dyn RecordStore>,
}

impl Sink {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Insert and commit a single record, rolling back on any failure.
    pub async fn write(&mut self, record: EmbeddingResult) -> Result<(), StoreError> {
        let row = StoredRow::from(record);

        if let Err(e) = self.write_row(&row).await {
            if let Err(rollback_err) = self.store.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn write_row(&mut self, row: &StoredRow) -> Result<(), StoreError> {
        self.store.begin().await?;
        self.store.insert(row).await?;
        self.store.commit().await
    }

    /// Like [`Sink::write`], but a failure is logged and reported as `false`.
    pub async fn persist(&mut self, record: EmbeddingResult) -> bool {
        let chars = record.text.chars().count();
        match self.write(record).await {
            Ok(()) => {
                debug!(chars, "record persisted");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to write record to store, rolled back");
                false
            }
        }
    }

    pub async fn close(mut self) {
        self.store.close().await;
    }
}
