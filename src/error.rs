//! Error types for the ingestion pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError { status, .. } => *status == 429 || *status >= 500,
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to the destination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to PostgreSQL: {0}")]
    ConnectionError(String),

    #[error("pgvector extension error: {0}")]
    ExtensionMissing(String),

    #[error("table does not exist: {0}")]
    TableMissing(String),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("invalid column name: {0}")]
    InvalidColumnName(String),

    #[error("transaction error: {0}")]
    TransactionError(String),

    #[error("insert error: {0}")]
    InsertError(String),

    #[error("query error: {0}")]
    QueryError(String),
}

/// Errors related to reading input documents.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid input pattern: {0}")]
    InvalidPattern(String),

    #[error("failed to read {path}: {reason}")]
    ReadError { path: String, reason: String },
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors that stop a pipeline worker or the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} worker setup failed: {reason}")]
    Setup { stage: &'static str, reason: String },

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}
