use async_trait::async_trait;
use std::fmt::Debug;

use super::{Response, ResponseMode, StreamingResponse};
use crate::domain::llm::TextStream;
use crate::domain::node::{QueryBundle, ScoredNode};
use crate::domain::{DomainError, QueryContext};

/// Turns a query plus retrieved nodes into an answer
#[async_trait]
pub trait ResponseSynthesizer: Send + Sync + Debug {
    /// Answer text for raw chunks, in the given order
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError>;

    /// Streams the answer. The default materializes it and yields one delta.
    async fn stream_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<TextStream, DomainError> {
        let text = self.get_response(ctx, query_str, text_chunks).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(text)])))
    }

    /// Empty node lists short-circuit to `Response::empty()` without any LLM call
    async fn synthesize(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
        nodes: Vec<ScoredNode>,
    ) -> Result<Response, DomainError> {
        ctx.check()?;
        if nodes.is_empty() {
            return Ok(Response::empty());
        }

        let chunks = node_texts(&nodes);
        let text = self.get_response(ctx, query.query_str(), &chunks).await?;
        Ok(Response::new(text, nodes))
    }

    async fn synthesize_streaming(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
        nodes: Vec<ScoredNode>,
    ) -> Result<StreamingResponse, DomainError> {
        ctx.check()?;
        if nodes.is_empty() {
            return Ok(StreamingResponse::from_response(Response::empty()));
        }

        let chunks = node_texts(&nodes);
        let stream = self.stream_response(ctx, query.query_str(), &chunks).await?;
        Ok(StreamingResponse::new(stream, nodes))
    }

    fn mode(&self) -> ResponseMode;
}

fn node_texts(nodes: &[ScoredNode]) -> Vec<String> {
    nodes.iter().map(|n| n.content().to_string()).collect()
}
