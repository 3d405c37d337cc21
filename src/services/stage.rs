//! Embedding stage: one remote call per batch, whole-batch failure semantics.

use tracing::{debug, error};

use crate::error::EmbeddingError;
use crate::models::{Batch, BatchOutcome, EmbeddingResult, FailureRecord};
use crate::services::embedding::Embedder;

pub struct EmbeddingStage {
    embedder: Box<dyn Embedder>,
}

impl EmbeddingStage {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Embed one batch.
    ///
    /// On success each vector is paired positionally with its document and the
    /// document text is trimmed; documents that trim to nothing are dropped and
    /// only counted. If the remote call fails, every document of the batch becomes
    /// a [`FailureRecord`] carrying the same reason and nothing is salvaged. A
    /// response with the wrong number of vectors counts as a failed call.
    pub async fn process(&self, batch: Batch) -> BatchOutcome {
        if batch.is_empty() {
            return BatchOutcome::default();
        }

        let texts: Vec<String> = batch.iter().map(|doc| doc.text.clone()).collect();
        let expected = texts.len();

        let result = self.embedder.embed_documents(texts).await.and_then(|vectors| {
            if vectors.len() == expected {
                Ok(vectors)
            } else {
                Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    expected,
                    vectors.len()
                )))
            }
        });

        match result {
            Ok(vectors) => {
                let mut outcome = BatchOutcome::default();
                for (doc, vector) in batch.into_iter().zip(vectors) {
                    let text = doc.text.trim();
                    if text.is_empty() {
                        debug!(identifier = %doc.identifier, "skipping empty document");
                        outcome.skipped_empty += 1;
                        continue;
                    }
                    outcome.processed.push(EmbeddingResult {
                        text: text.to_string(),
                        vector,
                    });
                }
                outcome
            }
            Err(e) => {
                let reason = e.to_string();
                let identifiers: Vec<&str> =
                    batch.iter().map(|doc| doc.identifier.as_str()).collect();
                error!(files = ?identifiers, error = %reason, "could not process batch");

                let failed = batch
                    .into_iter()
                    .map(|doc| FailureRecord {
                        identifier: doc.identifier,
                        reason: reason.clone(),
                    })
                    .collect();
                BatchOutcome {
                    processed: Vec::new(),
                    failed,
                    skipped_empty: 0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::services::testing::{FailingEmbedder, ScriptedEmbedder};

    fn batch(items: &[(&str, &str)]) -> Batch {
        items.iter().map(|(id, text)| Document::new(*id, *text)).collect()
    }

    #[tokio::test]
    async fn test_success_pairs_vectors_in_order() {
        let embedder = ScriptedEmbedder::new(4);
        let calls = embedder.calls();
        let stage = EmbeddingStage::new(Box::new(embedder));

        let outcome = stage
            .process(batch(&[("a.txt", "hello"), ("b.txt", "world")]))
            .await;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.processed.len(), 2);
        assert_eq!(outcome.processed[0].text, "hello");
        assert_eq!(outcome.processed[1].text, "world");
        assert!(outcome.processed.iter().all(|r| r.vector.len() == 4));
        // scripted vectors encode the input position
        assert_eq!(outcome.processed[1].vector[0], 1.0);
    }

    #[tokio::test]
    async fn test_whitespace_document_is_dropped_silently() {
        let stage = EmbeddingStage::new(Box::new(ScriptedEmbedder::new(4)));

        let outcome = stage.process(batch(&[("a.txt", "hi"), ("b.txt", "  ")])).await;

        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(outcome.processed[0].text, "hi");
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.skipped_empty, 1);
    }

    #[tokio::test]
    async fn test_text_is_trimmed_before_emitting() {
        let stage = EmbeddingStage::new(Box::new(ScriptedEmbedder::new(2)));
        let outcome = stage.process(batch(&[("a.txt", "\n  scroll  \n")])).await;
        assert_eq!(outcome.processed[0].text, "scroll");
    }

    #[tokio::test]
    async fn test_failed_call_fails_every_document() {
        let stage = EmbeddingStage::new(Box::new(FailingEmbedder::new(|| {
            EmbeddingError::ServerError {
                status: 429,
                body: "quota exceeded".to_string(),
            }
        })));

        let outcome = stage
            .process(batch(&[("a.txt", "x"), ("b.txt", "y"), ("c.txt", "z")]))
            .await;

        assert!(outcome.processed.is_empty());
        assert_eq!(outcome.failed.len(), 3);
        let ids: Vec<&str> = outcome.failed.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(
            outcome
                .failed
                .iter()
                .all(|f| f.reason == "embedding server error: status 429: quota exceeded")
        );
    }

    #[tokio::test]
    async fn test_failed_call_includes_blank_documents() {
        let stage = EmbeddingStage::new(Box::new(FailingEmbedder::new(|| EmbeddingError::Timeout)));
        let outcome = stage.process(batch(&[("a.txt", "x"), ("b.txt", "   ")])).await;
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.skipped_empty, 0);
    }

    struct ShortEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_documents(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![0.5; 4]])
        }
    }

    #[tokio::test]
    async fn test_short_response_fails_the_whole_batch() {
        let stage = EmbeddingStage::new(Box::new(ShortEmbedder));

        let outcome = stage.process(batch(&[("a.txt", "x"), ("b.txt", "y")])).await;

        assert!(outcome.processed.is_empty());
        assert_eq!(outcome.accounted(), 2);
        assert!(
            outcome
                .failed
                .iter()
                .all(|f| f.reason == "invalid embedding response: expected 2 embeddings, got 1")
        );
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let embedder = ScriptedEmbedder::new(4);
        let calls = embedder.calls();
        let stage = EmbeddingStage::new(Box::new(embedder));

        let outcome = stage.process(Vec::new()).await;

        assert_eq!(outcome.accounted(), 0);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
