use serde::{Deserialize, Serialize};

/// A single input document as produced by a source reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque identifier (usually a path), used only for failure reporting.
    pub identifier: String,
    pub text: String,
}

impl Document {
    pub fn new(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            text: text.into(),
        }
    }
}

/// An ordered group of documents submitted to the embedding service together.
pub type Batch = Vec<Document>;

/// A successfully embedded document, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// Trimmed document text.
    pub text: String,
    pub vector: Vec<f32>,
}

/// A document that could not be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub identifier: String,
    pub reason: String,
}

/// Output of the embedding stage for one batch, already split by outcome.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub processed: Vec<EmbeddingResult>,
    pub failed: Vec<FailureRecord>,
    pub skipped_empty: usize,
}

impl BatchOutcome {
    /// Number of input documents this outcome accounts for.
    pub fn accounted(&self) -> usize {
        self.processed.len() + self.failed.len() + self.skipped_empty
    }
}
