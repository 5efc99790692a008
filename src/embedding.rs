use async_trait::async_trait;

use crate::error::MemoryError;

/// Turns note and message text into vectors for similarity search.
/// No retries here: `CompanionMemory` decides whether a failure drops the
/// embedding (writes) or switches to recency (reads).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Embed several texts, results in input order. The fallback loops over
    /// `embed`; `OpenAiEmbedder` sends the whole slice as one `input` array.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimensionality of the embedding vectors this provider produces.
    fn dimensions(&self) -> usize;
}

/// Blanket impl so `Box<dyn EmbeddingProvider>` can be handed to `CompanionMemory::new()`.
#[async_trait]
impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        (**self).embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}
