mod batcher;
mod embedding;
mod failure;
mod router;
mod sink;
mod stage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use batcher::Batcher;
pub use embedding::{
    Embedder, EmbedderProvider, EmbeddingClient, RetryingEmbedder, build_embedder,
};
pub use failure::FailureSink;
pub use router::Router;
pub use sink::Sink;
pub use stage::EmbeddingStage;
pub use store::{MemoryStore, PgVectorStore, RecordStore, StoreProvider, StoredRow};
