use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{RecordStore, StoredRow};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<StoredRow>,
}

/// In-process table with staged writes, used for dry runs and tests.
///
/// Clones (and [`MemoryStore::connection`]s) share the committed rows but each
/// keeps its own open transaction, like separate connections to one database.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
    pending: Option<Vec<StoredRow>>,
    fail_insert_on: Option<String>,
    fail_commit_on: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts whose content equals `content`.
    pub fn failing_insert_on(mut self, content: &str) -> Self {
        self.fail_insert_on = Some(content.to_string());
        self
    }

    /// Reject the commit of a transaction holding a row whose content equals `content`.
    pub fn failing_commit_on(mut self, content: &str) -> Self {
        self.fail_commit_on = Some(content.to_string());
        self
    }

    /// A fresh connection to the same table, with no open transaction.
    pub fn connection(&self) -> Self {
        Self {
            pending: None,
            ..self.clone()
        }
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.table
            .lock()
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// How many connections to this table have been closed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.pending.is_some() {
            return Err(StoreError::TransactionError(
                "transaction already open".to_string(),
            ));
        }
        self.pending = Some(Vec::new());
        Ok(())
    }

    async fn insert(&mut self, row: &StoredRow) -> Result<(), StoreError> {
        if self.fail_insert_on.as_deref() == Some(row.content.as_str()) {
            return Err(StoreError::InsertError(format!(
                "simulated insert failure for {:?}",
                row.content
            )));
        }
        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| StoreError::TransactionError("no open transaction".to_string()))?;
        pending.push(row.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| StoreError::TransactionError("no open transaction".to_string()))?;

        if let Some(ref poison) = self.fail_commit_on
            && pending.iter().any(|r| &r.content == poison)
        {
            // leave the transaction open; the caller is expected to roll back
            return Err(StoreError::TransactionError(
                "simulated commit failure".to_string(),
            ));
        }

        let rows = self.pending.take().unwrap_or_default();
        let mut table = self
            .table
            .lock()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        table.rows.extend(rows);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.pending = None;
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<u64, StoreError> {
        let table = self
            .table
            .lock()
            .map_err(|e| StoreError::QueryError(e.to_string()))?;
        Ok(table.rows.len() as u64)
    }

    async fn close(&mut self) {
        self.pending = None;
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
