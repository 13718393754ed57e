//! Rewrites the query before delegating

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::query_engine::QueryEngine;
use crate::domain::transform::QueryTransform;
use crate::domain::{DomainError, QueryBundle, QueryContext, Response, StreamingResponse};

#[derive(Debug, Clone)]
pub struct TransformQueryEngine {
    inner: Arc<dyn QueryEngine>,
    transform: Arc<dyn QueryTransform>,
}

impl TransformQueryEngine {
    pub fn new(inner: Arc<dyn QueryEngine>, transform: Arc<dyn QueryTransform>) -> Self {
        Self { inner, transform }
    }

    async fn rewrite(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<QueryBundle, DomainError> {
        let rewritten = ctx.run(self.transform.transform(ctx, query)).await?;
        debug!(
            transform = self.transform.name(),
            embedding_strs = rewritten.embedding_strs().len(),
            "Transformed query"
        );
        Ok(rewritten)
    }
}

#[async_trait]
impl QueryEngine for TransformQueryEngine {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let rewritten = self.rewrite(ctx, query).await?;
        self.inner.query(ctx, &rewritten).await
    }

    async fn stream_query(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<StreamingResponse, DomainError> {
        let rewritten = self.rewrite(ctx, query).await?;
        self.inner.stream_query(ctx, &rewritten).await
    }
}
