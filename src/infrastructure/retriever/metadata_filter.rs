//! Post-filters another retriever's results by node metadata

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::retriever::Retriever;
use crate::domain::{DomainError, MetadataFilter, QueryBundle, QueryContext, ScoredNode};

/// Keeps only nodes matching both the configured filter and any filter on the query
#[derive(Debug, Clone)]
pub struct MetadataFilterRetriever {
    inner: Arc<dyn Retriever>,
    filter: MetadataFilter,
}

impl MetadataFilterRetriever {
    pub fn new(inner: Arc<dyn Retriever>, filter: MetadataFilter) -> Self {
        Self { inner, filter }
    }
}

#[async_trait]
impl Retriever for MetadataFilterRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let nodes = self.inner.retrieve(ctx, query).await?;
        let before = nodes.len();

        let kept: Vec<ScoredNode> = nodes
            .into_iter()
            .filter(|n| self.filter.matches(n.node.metadata()))
            .filter(|n| query.filters().is_none_or(|f| f.matches(n.node.metadata())))
            .collect();

        debug!(before, after = kept.len(), "Metadata filter applied");
        Ok(kept)
    }

    fn retriever_name(&self) -> &'static str {
        "metadata_filter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::FilterCondition;
    use crate::domain::retriever::MockRetriever;
    use crate::domain::Node;

    fn inner() -> Arc<MockRetriever> {
        Arc::new(MockRetriever::new(vec![
            ScoredNode::new(Node::with_id("a", "A").with_metadata("year", 2020), 0.9),
            ScoredNode::new(Node::with_id("b", "B").with_metadata("year", 2023), 0.8),
            ScoredNode::new(Node::with_id("c", "C"), 0.7),
        ]))
    }

    #[tokio::test]
    async fn test_filters_and_preserves_order() {
        let retriever = MetadataFilterRetriever::new(
            inner(),
            MetadataFilter::condition(FilterCondition::exists("year")),
        );

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("q"))
            .await
            .unwrap();

        let ids: Vec<&str> = nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_query_filter_also_applies() {
        let retriever = MetadataFilterRetriever::new(
            inner(),
            MetadataFilter::condition(FilterCondition::exists("year")),
        );
        let query = QueryBundle::new("q")
            .with_filters(MetadataFilter::condition(FilterCondition::gt("year", 2021)));

        let nodes = retriever
            .retrieve(&QueryContext::background(), &query)
            .await
            .unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "b");
    }
}
