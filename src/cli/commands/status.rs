use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{EmbeddingClient, PgVectorStore, RecordStore};

pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    let (embedding_healthy, embedding_error) = match EmbeddingClient::new(&config.embedding) {
        Ok(client) => match client.health_check().await {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        },
        Err(e) => (false, Some(e.to_string())),
    };

    let (store_connected, store_rows, store_error) =
        match PgVectorStore::connect(&config.store).await {
            Ok(mut store) => {
                let rows = store.count_rows().await;
                store.close().await;
                match rows {
                    Ok(n) => (true, Some(n), None),
                    Err(e) => (true, None, Some(e.to_string())),
                }
            }
            Err(e) => (false, None, Some(e.to_string())),
        };

    let status = StatusInfo {
        embedding_url: config.embedding.url.clone(),
        embedding_model: config.embedding.model.clone(),
        embedding_healthy,
        embedding_error,
        store_table: config.store.table.clone(),
        store_connected,
        store_rows,
        store_error,
    };

    print!("{}", formatter.format_status(&status));

    if !embedding_healthy || !store_connected {
        eprintln!();
        if !embedding_healthy {
            eprintln!("Warning: embedding service not reachable at {}", config.embedding.url);
        }
        if !store_connected {
            eprintln!("Warning: PostgreSQL not accessible. Check connection settings.");
        }
    }

    Ok(())
}
