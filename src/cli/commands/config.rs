use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with default values")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
}

pub fn handle_config(
    cmd: ConfigCommand,
    config: &Config,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let path = config_path
        .or_else(Config::config_path)
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    match cmd {
        ConfigCommand::Init { force } => handle_init(&path, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(config, format),
        ConfigCommand::Path => handle_path(&path, formatter.as_ref()),
    }
}

fn handle_init(path: &Path, force: bool, formatter: &dyn Formatter) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save_to(path)
        .context("failed to create config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(config: &Config, format: OutputFormat) -> Result<()> {
    let mut shown = config.clone();
    if shown.embedding.api_key.is_some() {
        shown.embedding.api_key = Some("********".to_string());
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        print!("{}", toml::to_string_pretty(&shown)?);
    }
    Ok(())
}

fn handle_path(path: &Path, formatter: &dyn Formatter) -> Result<()> {
    let state = if path.exists() { "active" } else { "would be" };
    print!(
        "{}",
        formatter.format_message(&format!("Config file ({}): {}", state, path.display()))
    );
    Ok(())
}
