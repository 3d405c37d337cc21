//! Run command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::watch;
use tracing::info;

use crate::cli::output::get_formatter;
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::pipeline::Pipeline;
use crate::services::{EmbedderProvider, MemoryStore, StoreProvider};
use crate::sources::GlobSource;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Glob pattern (or directory) selecting the input files
    #[arg(long, short = 'i')]
    pub input_pattern: String,

    /// Destination table, optionally schema-qualified
    #[arg(long)]
    pub table: Option<String>,

    /// Smallest batch emitted while input is still arriving
    #[arg(long)]
    pub min_batch_size: Option<usize>,

    /// Largest batch sent to the embedding service
    #[arg(long)]
    pub max_batch_size: Option<usize>,

    /// Number of embedding workers
    #[arg(long)]
    pub embed_workers: Option<usize>,

    /// Number of sink workers
    #[arg(long)]
    pub sink_workers: Option<usize>,

    /// Append failure records to this JSONL file
    #[arg(long)]
    pub failure_report: Option<PathBuf>,

    /// Keep embedded rows in memory instead of writing to PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ref table) = self.table {
            config.store.table = table.clone();
        }
        let p = &mut config.pipeline;
        if let Some(n) = self.min_batch_size {
            p.min_batch_size = n;
        }
        if let Some(n) = self.max_batch_size {
            p.max_batch_size = n;
        }
        if let Some(n) = self.embed_workers {
            p.embed_workers = n;
        }
        if let Some(n) = self.sink_workers {
            p.sink_workers = n;
        }
        if let Some(ref path) = self.failure_report {
            p.failure_report = Some(path.clone());
        }
    }
}

pub async fn handle_run(
    args: RunArgs,
    mut config: Config,
    format: OutputFormat,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    args.apply(&mut config);
    config.validate().map_err(AppError::from)?;

    let source = GlobSource::new(&args.input_pattern, config.pipeline.max_file_size);
    let documents = source
        .documents()
        .with_context(|| format!("failed to read input: {}", source.pattern()))?;

    let embedders: Arc<dyn EmbedderProvider> = Arc::new(config.embedding.clone());
    let dry_run_store = args.dry_run.then(MemoryStore::new);
    let stores: Arc<dyn StoreProvider> = match dry_run_store {
        Some(ref store) => Arc::new(store.clone()),
        None => Arc::new(config.store.clone()),
    };

    let pipeline = Pipeline::new(config.pipeline.clone(), embedders, stores);
    let report = pipeline
        .run(documents, cancel)
        .await
        .map_err(AppError::from)?;

    if let Some(store) = dry_run_store {
        info!(rows = store.rows().len(), "dry run kept rows in memory");
    }

    let formatter = get_formatter(format);
    print!("{}", formatter.format_run_report(&report));

    Ok(())
}
