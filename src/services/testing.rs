//! In-crate test doubles for the embedding service and store setup.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{EmbeddingError, StoreError};
use crate::services::embedding::{Embedder, EmbedderProvider};
use crate::services::store::{MemoryStore, RecordStore, StoreProvider};

/// Returns deterministic vectors: element 0 is the input position, the rest 0.5.
#[derive(Clone)]
pub struct ScriptedEmbedder {
    dimension: usize,
    poison: Option<String>,
    calls: Arc<AtomicU32>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            poison: None,
            calls: Arc::new(AtomicU32::new(0)),
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail any call whose batch contains `text`.
    pub fn poisoned_by(mut self, text: &str) -> Self {
        self.poison = Some(text.to_string());
        self
    }

    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn batch_sizes(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.batch_sizes)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());

        if let Some(ref poison) = self.poison
            && texts.iter().any(|t| t == poison)
        {
            return Err(EmbeddingError::ServerError {
                status: 400,
                body: "malformed batch".to_string(),
            });
        }

        Ok((0..texts.len())
            .map(|i| {
                let mut v = vec![0.5; self.dimension];
                v[0] = i as f32;
                v
            })
            .collect())
    }
}

/// Fails every call with a freshly built error.
pub struct FailingEmbedder {
    make_error: fn() -> EmbeddingError,
}

impl FailingEmbedder {
    pub fn new(make_error: fn() -> EmbeddingError) -> Self {
        Self { make_error }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_documents(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err((self.make_error)())
    }
}

impl EmbedderProvider for ScriptedEmbedder {
    fn create(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        Ok(Box::new(self.clone()))
    }
}

/// Provider whose client can never be built.
pub struct UnreachableProvider;

impl EmbedderProvider for UnreachableProvider {
    fn create(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        Err(EmbeddingError::ConnectionError(
            "no route to embedding service".to_string(),
        ))
    }
}

/// Store provider that fails the first `failures` opens, then hands out
/// connections to `store`.
pub struct FlakyStoreProvider {
    store: MemoryStore,
    failures: usize,
    opened: AtomicUsize,
}

impl FlakyStoreProvider {
    pub fn new(store: MemoryStore, failures: usize) -> Self {
        Self {
            store,
            failures,
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StoreProvider for FlakyStoreProvider {
    async fn open(&self) -> Result<Box<dyn RecordStore>, StoreError> {
        if self.opened.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(StoreError::ConnectionError(
                "connection refused".to_string(),
            ));
        }
        Ok(Box::new(self.store.connection()))
    }
}
