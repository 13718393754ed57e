use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Debug;
use std::pin::Pin;

use super::response::StreamChunk;
use super::{LlmRequest, LlmResponse};
use crate::domain::{DomainError, QueryContext};

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

/// Stream of plain text deltas
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// Trait for LLM providers. Every call observes the context's cancellation.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, ctx: &QueryContext, request: LlmRequest)
        -> Result<LlmResponse, DomainError>;

    /// Send a streaming chat completion request
    async fn chat_stream(
        &self,
        ctx: &QueryContext,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError>;

    /// Single-prompt completion
    async fn complete(&self, ctx: &QueryContext, prompt: &str) -> Result<String, DomainError> {
        let request = LlmRequest::builder().user(prompt).build();
        let response = self.chat(ctx, request).await?;
        Ok(response.content().to_string())
    }

    /// Single-prompt completion streamed as text deltas
    async fn stream_complete(
        &self,
        ctx: &QueryContext,
        prompt: &str,
    ) -> Result<TextStream, DomainError> {
        let request = LlmRequest::builder().user(prompt).build();
        let stream = self.chat_stream(ctx, request).await?;

        Ok(Box::pin(stream.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => chunk.delta.map(Ok),
                Err(e) => Some(Err(e)),
            }
        })))
    }

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Whether `LlmRequest::tools` is honored natively
    fn supports_tool_calling(&self) -> bool {
        false
    }

    /// Whether `LlmRequest::response_format` is honored natively
    fn supports_json_mode(&self) -> bool {
        false
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockLlmProvider;
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_complete_uses_user_message() {
        let llm = MockLlmProvider::new("mock").with_reply("pong");
        let ctx = QueryContext::background();

        let text = llm.complete(&ctx, "ping").await.unwrap();

        assert_eq!(text, "pong");
        assert_eq!(llm.prompts(), vec!["ping".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_complete_yields_deltas() {
        let llm = MockLlmProvider::new("mock").with_reply("hello streaming world");
        let ctx = QueryContext::background();

        let deltas: Vec<String> = llm
            .stream_complete(&ctx, "hi")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas.concat(), "hello streaming world");
    }

    #[tokio::test]
    async fn test_scripted_replies_then_fallback() {
        let llm = MockLlmProvider::new("mock")
            .with_error("first fails")
            .with_reply("second")
            .with_default_reply("again");
        let ctx = QueryContext::background();

        assert!(llm.complete(&ctx, "a").await.is_err());
        assert_eq!(llm.complete(&ctx, "b").await.unwrap(), "second");
        assert_eq!(llm.complete(&ctx, "c").await.unwrap(), "again");
        assert_eq!(llm.complete(&ctx, "d").await.unwrap(), "again");
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_call() {
        let llm = MockLlmProvider::new("mock").with_default_reply("never");
        let (ctx, handle) = QueryContext::with_cancel();
        handle.cancel();

        let err = llm.complete(&ctx, "x").await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(llm.call_count(), 0);
    }
}
