//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::{DomainError, QueryContext};

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed_text(&self, ctx: &QueryContext, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Embed a batch, preserving input order
    async fn embed_texts(
        &self,
        ctx: &QueryContext,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            ctx.check()?;
            embeddings.push(self.embed_text(ctx, text).await?);
        }
        Ok(embeddings)
    }

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Embedding dimensions, when known
    fn dimensions(&self) -> Option<usize> {
        None
    }
}
