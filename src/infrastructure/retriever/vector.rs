//! Dense retrieval over a vector store

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::embedding::{mean_embedding, EmbeddingProvider};
use crate::domain::node::sort_scored_nodes;
use crate::domain::retriever::Retriever;
use crate::domain::store::{VectorStore, VectorStoreQuery};
use crate::domain::{DomainError, QueryBundle, QueryContext, ScoredNode};
use crate::infrastructure::observability::record_retrieval;

pub const DEFAULT_SIMILARITY_TOP_K: usize = 2;

/// Embeds the query and returns the `top_k` most similar stored nodes
#[derive(Debug, Clone)]
pub struct VectorIndexRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl VectorIndexRetriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_SIMILARITY_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Result<Self, DomainError> {
        if top_k == 0 {
            return Err(DomainError::invalid_config("top_k must be greater than 0"));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// The bundle's embedding, or the mean embedding of its embedding strings
    async fn query_embedding(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<f32>, DomainError> {
        if let Some(embedding) = query.embedding() {
            return Ok(embedding.to_vec());
        }

        let texts: Vec<String> = query.embedding_strs().into_iter().map(String::from).collect();
        let embeddings = ctx.run(self.embedder.embed_texts(ctx, &texts)).await?;

        mean_embedding(&embeddings)
            .ok_or_else(|| DomainError::upstream("embedding", "provider returned no embeddings"))
    }
}

#[async_trait]
impl Retriever for VectorIndexRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let started = Instant::now();
        let embedding = self.query_embedding(ctx, query).await?;

        let store_query =
            VectorStoreQuery::new(embedding, self.top_k).with_filters(query.filters().cloned());
        let hits = ctx.run(self.store.query(ctx, &store_query)).await?;

        let mut nodes = Vec::with_capacity(hits.len());
        for hit in hits {
            let node = ctx.run(self.store.get(ctx, &hit.id)).await?;
            nodes.push(ScoredNode::new(node, hit.score));
        }
        sort_scored_nodes(&mut nodes);

        debug!(
            store = self.store.store_type(),
            returned = nodes.len(),
            "Vector retrieval complete"
        );
        record_retrieval(self.retriever_name(), started.elapsed(), nodes.len());
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "vector"
    }
}
