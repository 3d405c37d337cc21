use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::{Batch, Document};

/// Groups documents into batches of `min..=max` documents, preserving arrival order.
///
/// Only the final batch of a run may be smaller than `min`, and no batch is ever empty.
#[derive(Debug)]
pub struct Batcher {
    min: usize,
    max: usize,
    buffer: Vec<Document>,
}

impl Batcher {
    pub fn new(min: usize, max: usize) -> Self {
        let max = max.max(1);
        let min = min.clamp(1, max);
        Self {
            min,
            max,
            buffer: Vec::with_capacity(max),
        }
    }

    /// Add a document; returns a full batch once `max` documents are buffered.
    pub fn push(&mut self, doc: Document) -> Option<Batch> {
        self.buffer.push(doc);
        if self.buffer.len() >= self.max {
            return Some(self.take());
        }
        None
    }

    /// Release the buffer early if it already satisfies the lower bound.
    pub fn take_ready(&mut self) -> Option<Batch> {
        if self.buffer.len() >= self.min {
            return Some(self.take());
        }
        None
    }

    /// Release whatever remains at end of input.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.take())
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn take(&mut self) -> Batch {
        std::mem::replace(&mut self.buffer, Vec::with_capacity(self.max))
    }

    /// Drive the batcher from a document queue into a batch queue.
    ///
    /// A partial batch is dispatched when no document arrives for `linger` and the
    /// buffer holds at least `min`. Returns the number of batches emitted.
    pub async fn run(
        mut self,
        mut docs: mpsc::Receiver<Document>,
        batches: async_channel::Sender<Batch>,
        linger: Duration,
    ) -> Result<u64, PipelineError> {
        let mut emitted = 0u64;

        loop {
            let next = if self.buffer.is_empty() {
                docs.recv().await
            } else {
                match timeout(linger, docs.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        if let Some(batch) = self.take_ready() {
                            send(&batches, batch).await?;
                            emitted += 1;
                        }
                        continue;
                    }
                }
            };

            match next {
                Some(doc) => {
                    if let Some(batch) = self.push(doc) {
                        send(&batches, batch).await?;
                        emitted += 1;
                    }
                }
                None => break,
            }
        }

        if let Some(batch) = self.finish() {
            send(&batches, batch).await?;
            emitted += 1;
        }

        batches.close();
        debug!(batches = emitted, "batcher drained");
        Ok(emitted)
    }
}

async fn send(batches: &async_channel::Sender<Batch>, batch: Batch) -> Result<(), PipelineError> {
    debug!(size = batch.len(), "dispatching batch");
    batches
        .send(batch)
        .await
        .map_err(|_| PipelineError::ChannelClosed("batch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(format!("{}.txt", i), format!("text {}", i)))
            .collect()
    }

    fn split(min: usize, max: usize, input: Vec<Document>) -> Vec<Batch> {
        let mut batcher = Batcher::new(min, max);
        let mut out: Vec<Batch> = input.into_iter().filter_map(|d| batcher.push(d)).collect();
        out.extend(batcher.finish());
        out
    }

    #[test]
    fn test_three_documents_max_two() {
        let batches = split(1, 2, docs(3));
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_order_preserved_within_batches() {
        let batches = split(1, 3, docs(7));
        let flat: Vec<String> = batches.into_iter().flatten().map(|d| d.identifier).collect();
        let expected: Vec<String> = (0..7).map(|i| format!("{}.txt", i)).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_empty_input_produces_no_batches() {
        assert!(split(1, 4, Vec::new()).is_empty());
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let batches = split(2, 2, docs(4));
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 2));
    }

    #[test]
    fn test_take_ready_respects_min() {
        let mut batcher = Batcher::new(2, 4);
        batcher.push(Document::new("a", "a"));
        assert!(batcher.take_ready().is_none());
        batcher.push(Document::new("b", "b"));
        assert_eq!(batcher.take_ready().unwrap().len(), 2);
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn test_bounds_are_normalized() {
        let mut batcher = Batcher::new(0, 0);
        assert!(batcher.push(Document::new("a", "a")).is_some());
    }

    #[tokio::test]
    async fn test_run_flushes_tail_and_closes() {
        let (doc_tx, doc_rx) = mpsc::channel(8);
        let (batch_tx, batch_rx) = async_channel::bounded(8);

        for doc in docs(3) {
            doc_tx.send(doc).await.unwrap();
        }
        drop(doc_tx);

        let emitted = Batcher::new(1, 2)
            .run(doc_rx, batch_tx, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(emitted, 2);

        let mut sizes = Vec::new();
        while let Ok(batch) = batch_rx.recv().await {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_run_lingers_then_dispatches_partial_batch() {
        let (doc_tx, doc_rx) = mpsc::channel(8);
        let (batch_tx, batch_rx) = async_channel::bounded(8);

        let handle = tokio::spawn(
            Batcher::new(1, 10).run(doc_rx, batch_tx, Duration::from_millis(20)),
        );

        doc_tx.send(Document::new("a.txt", "a")).await.unwrap();
        let first = batch_rx.recv().await.unwrap();
        assert_eq!(first.len(), 1);

        drop(doc_tx);
        assert_eq!(handle.await.unwrap().unwrap(), 1);
        assert!(batch_rx.recv().await.is_err());
    }
}
