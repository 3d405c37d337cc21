use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::models::{BatchOutcome, EmbeddingResult, FailureRecord};

/// Splits embedding-stage output into the `processed` and `failed` channels.
#[derive(Clone)]
pub struct Router {
    processed: async_channel::Sender<EmbeddingResult>,
    failed: mpsc::Sender<FailureRecord>,
}

impl Router {
    pub fn new(
        processed: async_channel::Sender<EmbeddingResult>,
        failed: mpsc::Sender<FailureRecord>,
    ) -> Self {
        Self { processed, failed }
    }

    /// Forward every item of `outcome` to exactly one channel.
    pub async fn route(&self, outcome: BatchOutcome) -> Result<(), PipelineError> {
        for result in outcome.processed {
            self.processed
                .send(result)
                .await
                .map_err(|_| PipelineError::ChannelClosed("processed"))?;
        }
        for record in outcome.failed {
            self.failed
                .send(record)
                .await
                .map_err(|_| PipelineError::ChannelClosed("failed"))?;
        }
        Ok(())
    }
}
