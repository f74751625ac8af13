use async_trait::async_trait;

use super::types::{ChatRequest, Completion, ServiceError};

/// Text-embedding capability.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// provider name for logs (e.g. "openai")
    fn name(&self) -> &str;

    /// fixed dimension of every returned vector
    fn dimension(&self) -> usize;

    /// embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// embed many texts; output order matches input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Language-model completion capability (request/response, no streaming).
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: ChatRequest) -> Result<Completion, ServiceError>;
}
