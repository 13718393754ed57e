//! Retrieve, then synthesize

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::llm::LlmProvider;
use crate::domain::query_engine::QueryEngine;
use crate::domain::retriever::Retriever;
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{
    DomainError, QueryBundle, QueryContext, Response, ResponseMode, ScoredNode, StreamingResponse,
};
use crate::infrastructure::observability::record_query;
use crate::infrastructure::synthesizer::get_response_synthesizer;

const ENGINE_NAME: &str = "retriever";

/// Answers with a synthesizer over whatever the retriever returns
#[derive(Debug, Clone)]
pub struct RetrieverQueryEngine {
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
}

impl RetrieverQueryEngine {
    pub fn new(retriever: Arc<dyn Retriever>, synthesizer: Arc<dyn ResponseSynthesizer>) -> Self {
        Self {
            retriever,
            synthesizer,
        }
    }

    /// Uses the default synthesizer for `mode`
    pub fn from_args(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn LlmProvider>,
        mode: ResponseMode,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(retriever, get_response_synthesizer(llm, mode)?))
    }

    pub fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &Arc<dyn ResponseSynthesizer> {
        &self.synthesizer
    }

    pub async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let nodes = ctx.run(self.retriever.retrieve(ctx, query)).await?;
        debug!(
            retriever = self.retriever.retriever_name(),
            nodes = nodes.len(),
            "Retrieved nodes"
        );
        Ok(nodes)
    }

    pub async fn synthesize(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
        nodes: Vec<ScoredNode>,
    ) -> Result<Response, DomainError> {
        self.synthesizer.synthesize(ctx, query, nodes).await
    }

    async fn answer(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let nodes = self.retrieve(ctx, query).await?;
        self.synthesize(ctx, query, nodes).await
    }
}

#[async_trait]
impl QueryEngine for RetrieverQueryEngine {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let started = Instant::now();
        let result = self.answer(ctx, query).await;
        record_query(ENGINE_NAME, started.elapsed(), result.is_ok());

        if let Ok(response) = &result {
            info!(
                mode = %self.synthesizer.mode(),
                sources = response.source_nodes.len(),
                "Query answered"
            );
        }
        result
    }

    async fn stream_query(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<StreamingResponse, DomainError> {
        let nodes = self.retrieve(ctx, query).await?;
        self.synthesizer.synthesize_streaming(ctx, query, nodes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::retriever::MockRetriever;
    use crate::domain::EMPTY_RESPONSE;
    use crate::infrastructure::synthesizer::SimpleSummarize;

    fn france_retriever() -> Arc<MockRetriever> {
        Arc::new(MockRetriever::with_texts(&[
            ("n1", "The capital of France is Paris.", 0.9),
            ("n2", "Paris is known for the Eiffel Tower.", 0.8),
        ]))
    }

    #[tokio::test]
    async fn test_happy_path() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("Paris is the capital of France."));
        let engine = RetrieverQueryEngine::new(
            france_retriever(),
            Arc::new(SimpleSummarize::new(llm.clone())),
        );

        let response = engine
            .query_text(&QueryContext::background(), "What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(response.text(), "Paris is the capital of France.");
        let ids: Vec<&str> = response.source_nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provenance_matches_retrieval() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_default_reply("answer"));
        let engine =
            RetrieverQueryEngine::from_args(france_retriever(), llm, ResponseMode::Refine).unwrap();
        let ctx = QueryContext::background();
        let query = QueryBundle::new("q");

        let retrieved = engine.retrieve(&ctx, &query).await.unwrap();
        let response = engine.query(&ctx, &query).await.unwrap();

        assert_eq!(response.source_nodes, retrieved);
    }

    #[tokio::test]
    async fn test_empty_retrieval_gives_empty_response() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));
        let engine = RetrieverQueryEngine::new(
            Arc::new(MockRetriever::new(Vec::new())),
            Arc::new(SimpleSummarize::new(llm.clone())),
        );

        let response = engine.query_text(&QueryContext::background(), "q").await.unwrap();
        assert_eq!(response.text(), EMPTY_RESPONSE);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retriever_error_propagates() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));
        let retriever = Arc::new(
            MockRetriever::new(Vec::new()).with_error(DomainError::upstream("store", "down")),
        );
        let engine = RetrieverQueryEngine::new(retriever, Arc::new(SimpleSummarize::new(llm)));

        let err = engine.query_text(&QueryContext::background(), "q").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_stream_query() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("streamed Paris answer"));
        let engine = RetrieverQueryEngine::new(
            france_retriever(),
            Arc::new(SimpleSummarize::new(llm)),
        );
        let ctx = QueryContext::background();

        let mut streaming = engine.stream_query(&ctx, &QueryBundle::new("q")).await.unwrap();
        assert_eq!(streaming.source_nodes().len(), 2);

        let response = streaming.get_response(&ctx).await.unwrap();
        assert_eq!(response.text(), "streamed Paris answer");
    }

    #[tokio::test]
    async fn test_cancelled_before_retrieval() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));
        let retriever = france_retriever();
        let engine = RetrieverQueryEngine::new(retriever.clone(), Arc::new(SimpleSummarize::new(llm)));
        let (ctx, handle) = QueryContext::with_cancel();
        handle.cancel();

        let err = engine.query_text(&ctx, "q").await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(retriever.call_count(), 0);
    }
}
