//! CLI module for the ingestion pipeline.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{Config, OutputFormat};

/// Batch-embed text documents and persist them into PostgreSQL/pgvector.
#[derive(Debug, Parser)]
#[command(name = "inscribe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        default_value = "text",
        help = "Output format: text, json, or markdown"
    )]
    pub format: OutputFormat,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'c', global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "INSCRIBE_DATABASE_URL",
        hide_env_values = true,
        help = "PostgreSQL connection URL"
    )]
    pub database_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "INSCRIBE_EMBEDDING_URL",
        help = "Embedding service base URL"
    )]
    pub embedding_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "INSCRIBE_EMBEDDING_API_KEY",
        hide_env_values = true,
        help = "Bearer token for the embedding service"
    )]
    pub embedding_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply connection flags and environment variables on top of the file config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref url) = self.database_url {
            config.store.url = url.clone();
        }
        if let Some(ref url) = self.embedding_url {
            config.embedding.url = url.clone();
        }
        if let Some(ref key) = self.embedding_api_key {
            config.embedding.api_key = Some(key.clone());
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Embed every matching file and persist the results
    Run(commands::RunArgs),

    /// Check infrastructure status (embedding server, PostgreSQL)
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "inscribe",
            "--format",
            "json",
            "run",
            "--input-pattern",
            "docs/**/*.md",
            "--max-batch-size",
            "8",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input_pattern, "docs/**/*.md");
                assert_eq!(args.max_batch_size, Some(8));
                assert_eq!(args.min_batch_size, None);
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_connection_overrides() {
        let cli = Cli::try_parse_from([
            "inscribe",
            "--database-url",
            "postgres://ingest@db:5432/corpus",
            "--embedding-url",
            "http://embedder:8080",
            "status",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.store.url, "postgres://ingest@db:5432/corpus");
        assert_eq!(config.embedding.url, "http://embedder:8080");
    }

    #[test]
    fn test_run_requires_input_pattern() {
        assert!(Cli::try_parse_from(["inscribe", "run"]).is_err());
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["inscribe", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(commands::ConfigCommand::Init { force: true })
        ));
    }
}
