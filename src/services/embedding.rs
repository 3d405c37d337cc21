//! Remote embedding service client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryPolicy, with_retry};

/// Anything that can turn an ordered list of texts into positionally aligned vectors.
///
/// One call is one remote request: implementations must not split the input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    inputs: Vec<String>,
    task_type: &'a str,
    output_dimensionality: u32,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// HTTP client for the embedding server.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    task_type: String,
    dimension: u32,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            task_type: config.task_type.clone(),
            dimension: config.dimension,
            api_key: config.api_key.clone(),
        })
    }

    pub async fn health_check(&self) -> Result<(), EmbeddingError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::ServerError {
                status: response.status().as_u16(),
                body: "health check failed".to_string(),
            });
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    fn validate(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
        if vectors.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }
        if let Some((i, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != self.dimension as usize)
        {
            return Err(EmbeddingError::InvalidResponse(format!(
                "embedding {} has dimension {}, expected {}",
                i,
                v.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            inputs: texts,
            task_type: &self.task_type,
            output_dimensionality: self.dimension,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else if e.is_connect() {
                EmbeddingError::ConnectionError(e.to_string())
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError { status, body });
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let vectors: Vec<Vec<f32>> = embed_response
            .embeddings
            .into_iter()
            .map(|e| e.values)
            .collect();
        self.validate(expected, &vectors)?;

        Ok(vectors)
    }
}

/// Retries transient failures of the wrapped embedder with exponential backoff.
///
/// Sits above the embedding stage: the stage still sees a single call per batch.
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        with_retry(&self.policy, || self.inner.embed_documents(texts.clone()))
            .await
            .map_err(|(error, _attempts)| error)
    }
}

/// Build the embedder a worker owns, with the retry layer when configured.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    let client = EmbeddingClient::new(config)?;
    if config.max_attempts > 1 {
        Ok(Box::new(RetryingEmbedder::new(
            client,
            RetryPolicy::new(config.max_attempts),
        )))
    } else {
        Ok(Box::new(client))
    }
}

/// Creates the embedder each embedding worker owns for its lifetime.
pub trait EmbedderProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn Embedder>, EmbeddingError>;
}

impl EmbedderProvider for EmbeddingConfig {
    fn create(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        build_embedder(self)
    }
}
