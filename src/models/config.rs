use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-005";
pub const DEFAULT_TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost:5432/arcane_wisdom";
pub const DEFAULT_TABLE: &str = "documents";
pub const DEFAULT_CONTENT_COLUMN: &str = "content";
pub const DEFAULT_EMBEDDING_COLUMN: &str = "embedding";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("inscribe").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if p.min_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.min_batch_size must be at least 1".to_string(),
            ));
        }
        if p.min_batch_size > p.max_batch_size {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.min_batch_size ({}) exceeds pipeline.max_batch_size ({})",
                p.min_batch_size, p.max_batch_size
            )));
        }
        if p.embed_workers == 0 || p.sink_workers == 0 {
            return Err(ConfigError::ValidationError(
                "worker counts must be at least 1".to_string(),
            ));
        }
        if p.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.embedding.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.max_attempts must be at least 1".to_string(),
            ));
        }
        if !is_valid_table_name(&self.store.table) {
            return Err(ConfigError::ValidationError(format!(
                "store.table is not a valid identifier: {}",
                self.store.table
            )));
        }
        for column in [&self.store.content_column, &self.store.embedding_column] {
            if !is_valid_identifier(column) {
                return Err(ConfigError::ValidationError(format!(
                    "store column is not a valid identifier: {}",
                    column
                )));
            }
        }
        Ok(())
    }
}

/// Accepts `table` or `schema.table` where each part is a plain SQL identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| is_valid_identifier(part))
}

/// A plain unquoted SQL identifier: a letter or underscore, then letters, digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_task_type")]
    pub task_type: String,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per batch call; 1 disables the retry layer.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    1
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_model(),
            task_type: default_task_type(),
            dimension: default_dimension(),
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_table")]
    pub table: String,

    /// Column receiving the document text.
    #[serde(default = "default_content_column")]
    pub content_column: String,

    /// `vector` column receiving the embedding.
    #[serde(default = "default_embedding_column")]
    pub embedding_column: String,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_content_column() -> String {
    DEFAULT_CONTENT_COLUMN.to_string()
}

fn default_embedding_column() -> String {
    DEFAULT_EMBEDDING_COLUMN.to_string()
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            table: default_table(),
            content_column: default_content_column(),
            embedding_column: default_embedding_column(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Idle time after which a partial batch of at least `min_batch_size` is dispatched.
    #[serde(default = "default_batch_linger_ms")]
    pub batch_linger_ms: u64,

    #[serde(default = "default_workers")]
    pub embed_workers: usize,

    #[serde(default = "default_workers")]
    pub sink_workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_report: Option<PathBuf>,
}

fn default_min_batch_size() -> usize {
    1
}

fn default_max_batch_size() -> usize {
    2
}

fn default_batch_linger_ms() -> u64 {
    200
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_batch_size: default_min_batch_size(),
            max_batch_size: default_max_batch_size(),
            batch_linger_ms: default_batch_linger_ms(),
            embed_workers: default_workers(),
            sink_workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_file_size: default_max_file_size(),
            failure_report: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.embedding.task_type, "RETRIEVAL_DOCUMENT");
        assert_eq!(config.store.table, DEFAULT_TABLE);
        assert_eq!(config.pipeline.min_batch_size, 1);
        assert_eq!(config.pipeline.max_batch_size, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            max_batch_size = 16

            [store]
            table = "ancient_scrolls"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.max_batch_size, 16);
        assert_eq!(config.pipeline.min_batch_size, 1);
        assert_eq!(config.store.table, "ancient_scrolls");
        assert_eq!(config.store.content_column, DEFAULT_CONTENT_COLUMN);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.pipeline.embed_workers = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pipeline.embed_workers, 7);
    }

    #[test]
    fn test_validate_rejects_bad_batch_bounds() {
        let mut config = Config::default();
        config.pipeline.min_batch_size = 0;
        assert!(config.validate().is_err());

        config.pipeline.min_batch_size = 5;
        config.pipeline.max_batch_size = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_table_name() {
        let mut config = Config::default();
        config.store.table = "docs; DROP TABLE users".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_columns_are_validated() {
        let mut config: Config = toml::from_str(
            r#"
            [store]
            table = "ancient_scrolls"
            content_column = "scroll_content"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.content_column, "scroll_content");
        assert_eq!(config.store.embedding_column, "embedding");
        assert!(config.validate().is_ok());

        config.store.embedding_column = "embedding, content".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_valid_table_name() {
        assert!(is_valid_table_name("documents"));
        assert!(is_valid_table_name("public.ancient_scrolls"));
        assert!(is_valid_table_name("_t1"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("1docs"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("docs-2024"));
    }
}
