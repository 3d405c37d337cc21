mod config;
mod document;
mod report;

pub use config::{
    Config, DEFAULT_CONTENT_COLUMN, DEFAULT_DATABASE_URL, DEFAULT_EMBEDDING_COLUMN,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL, DEFAULT_TABLE,
    DEFAULT_TASK_TYPE, EmbeddingConfig, PipelineConfig, StoreConfig, is_valid_identifier,
    is_valid_table_name,
};
pub use document::{Batch, BatchOutcome, Document, EmbeddingResult, FailureRecord};
pub use report::{EmbedStats, OutputFormat, RunReport, SinkStats};
