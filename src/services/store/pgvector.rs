use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::debug;

use super::{RecordStore, StoredRow};
use crate::error::StoreError;
use crate::models::{StoreConfig, is_valid_identifier, is_valid_table_name};

/// PostgreSQL/pgvector store holding exactly one connection.
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    insert_sql: String,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgVectorStore {
    /// Connect and verify the extension and target table exist.
    ///
    /// The table is never created here; schema management happens elsewhere.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        if !is_valid_table_name(&config.table) {
            return Err(StoreError::InvalidTableName(config.table.clone()));
        }
        for column in [&config.content_column, &config.embedding_column] {
            if !is_valid_identifier(column) {
                return Err(StoreError::InvalidColumnName(column.clone()));
            }
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self {
            pool,
            table: config.table.clone(),
            insert_sql: insert_sql(config),
            tx: None,
        };

        if let Err(e) = store.check_ready().await {
            store.pool.close().await;
            return Err(e);
        }

        debug!(table = %store.table, "store connection ready");
        Ok(store)
    }

    async fn check_ready(&self) -> Result<(), StoreError> {
        let extension: Option<(String,)> =
            sqlx::query_as("SELECT extname::text FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::QueryError(e.to_string()))?;

        if extension.is_none() {
            return Err(StoreError::ExtensionMissing(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        let (regclass,): (Option<String>,) = sqlx::query_as("SELECT to_regclass($1)::text")
            .bind(&self.table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        if regclass.is_none() {
            return Err(StoreError::TableMissing(self.table.clone()));
        }

        Ok(())
    }
}

fn insert_sql(config: &StoreConfig) -> String {
    format!(
        "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
        config.table, config.content_column, config.embedding_column
    )
}

#[async_trait]
impl RecordStore for PgVectorStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::TransactionError(
                "transaction already open".to_string(),
            ));
        }
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn insert(&mut self, row: &StoredRow) -> Result<(), StoreError> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| StoreError::TransactionError("no open transaction".to_string()))?;

        let embedding = Vector::from(row.embedding.clone());
        sqlx::query(&self.insert_sql)
            .bind(&row.content)
            .bind(&embedding)
            .execute(&mut **tx)
            .await
            .map_err(|e| StoreError::InsertError(e.to_string()))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::TransactionError("no open transaction".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionError(e.to_string()))
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx
                .rollback()
                .await
                .map_err(|e| StoreError::TransactionError(e.to_string())),
            None => Ok(()),
        }
    }

    async fn count_rows(&mut self) -> Result<u64, StoreError> {
        let query = format!("SELECT COUNT(*) FROM {}", self.table);
        let (count,): (i64,) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;
        Ok(count as u64)
    }

    async fn close(&mut self) {
        if let Err(e) = self.rollback().await {
            debug!(error = %e, "rollback on close failed");
        }
        self.pool.close().await;
    }
}
