//! In-memory vector store using brute-force cosine similarity

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::embedding::cosine_similarity;
use crate::domain::store::{ScoredId, VectorStore, VectorStoreQuery};
use crate::domain::{DomainError, Node, QueryContext};

/// Keeps nodes in insertion order; suitable for development and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    nodes: Arc<RwLock<Vec<Node>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Every stored node, in insertion order
    pub async fn nodes(&self) -> Vec<Node> {
        self.nodes.read().await.clone()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, ctx: &QueryContext, nodes: Vec<Node>) -> Result<Vec<String>, DomainError> {
        ctx.check()?;

        if let Some(node) = nodes.iter().find(|n| n.embedding().is_none()) {
            return Err(DomainError::bad_input(format!(
                "node '{}' has no embedding",
                node.id()
            )));
        }

        let mut stored = self.nodes.write().await;

        // Ids are bound to their content; the whole batch is rejected on a conflict
        for (index, node) in nodes.iter().enumerate() {
            let known = stored
                .iter()
                .chain(nodes[..index].iter())
                .find(|n| n.id() == node.id());

            if known.is_some_and(|n| n.content() != node.content()) {
                return Err(DomainError::bad_input(format!(
                    "node id '{}' is already bound to different content",
                    node.id()
                )));
            }
        }

        let mut ids = Vec::with_capacity(nodes.len());

        for node in nodes {
            ids.push(node.id().to_string());
            if !stored.iter().any(|n| n.id() == node.id()) {
                stored.push(node);
            }
        }

        debug!(added = ids.len(), total = stored.len(), "Nodes added to vector store");
        Ok(ids)
    }

    async fn query(
        &self,
        ctx: &QueryContext,
        query: &VectorStoreQuery,
    ) -> Result<Vec<ScoredId>, DomainError> {
        ctx.check()?;

        let stored = self.nodes.read().await;
        let mut scored: Vec<ScoredId> = stored
            .iter()
            .filter(|node| {
                query
                    .filters
                    .as_ref()
                    .is_none_or(|filter| filter.matches(node.metadata()))
            })
            .filter_map(|node| {
                node.embedding().map(|embedding| ScoredId {
                    id: node.id().to_string(),
                    score: cosine_similarity(&query.embedding, embedding),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(query.top_k);

        Ok(scored)
    }

    async fn get(&self, ctx: &QueryContext, id: &str) -> Result<Node, DomainError> {
        ctx.check()?;

        self.nodes
            .read()
            .await
            .iter()
            .find(|n| n.id() == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("node '{}'", id)))
    }

    async fn delete(&self, ctx: &QueryContext, id: &str) -> Result<bool, DomainError> {
        ctx.check()?;

        let mut stored = self.nodes.write().await;
        let before = stored.len();
        stored.retain(|n| n.id() != id);

        Ok(stored.len() < before)
    }

    fn store_type(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::FilterCondition;
    use crate::domain::MetadataFilter;

    async fn seeded() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        let ctx = QueryContext::background();
        store
            .add(
                &ctx,
                vec![
                    Node::with_id("a", "alpha")
                        .with_embedding(vec![1.0, 0.0])
                        .with_metadata("lang", "en"),
                    Node::with_id("b", "beta")
                        .with_embedding(vec![0.7, 0.7])
                        .with_metadata("lang", "de"),
                    Node::with_id("c", "gamma")
                        .with_embedding(vec![0.0, 1.0])
                        .with_metadata("lang", "en"),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let store = seeded().await;
        let ctx = QueryContext::background();

        let results = store
            .query(&ctx, &VectorStoreQuery::new(vec![1.0, 0.1], 2))
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let store = seeded().await;
        let ctx = QueryContext::background();
        let filter = MetadataFilter::condition(FilterCondition::eq("lang", "en"));

        let results = store
            .query(
                &ctx,
                &VectorStoreQuery::new(vec![0.7, 0.7], 5).with_filters(Some(filter)),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.id != "b"));
    }

    #[tokio::test]
    async fn test_add_requires_embedding() {
        let store = InMemoryVectorStore::new();
        let result = store
            .add(&QueryContext::background(), vec![Node::with_id("x", "no vector")])
            .await;

        assert!(matches!(result, Err(DomainError::BadInput { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_rejects_reused_id_with_new_content() {
        let store = seeded().await;
        let ctx = QueryContext::background();

        let result = store
            .add(
                &ctx,
                vec![
                    Node::with_id("d", "delta").with_embedding(vec![0.5, 0.5]),
                    Node::with_id("a", "different content").with_embedding(vec![0.0, 1.0]),
                ],
            )
            .await;

        assert!(matches!(result, Err(DomainError::BadInput { .. })));
        assert_eq!(store.get(&ctx, "a").await.unwrap().content(), "alpha");
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_conflicting_ids_in_one_batch() {
        let store = InMemoryVectorStore::new();
        let result = store
            .add(
                &QueryContext::background(),
                vec![
                    Node::with_id("x", "one").with_embedding(vec![1.0]),
                    Node::with_id("x", "two").with_embedding(vec![1.0]),
                ],
            )
            .await;

        assert!(matches!(result, Err(DomainError::BadInput { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_readding_same_content_is_noop() {
        let store = seeded().await;
        let ctx = QueryContext::background();

        let ids = store
            .add(
                &ctx,
                vec![Node::with_id("a", "alpha").with_embedding(vec![1.0, 0.0])],
            )
            .await
            .unwrap();

        assert_eq!(ids, vec!["a"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let store = seeded().await;
        let ctx = QueryContext::background();

        assert_eq!(store.get(&ctx, "b").await.unwrap().content(), "beta");
        assert!(store.delete(&ctx, "b").await.unwrap());
        assert!(!store.delete(&ctx, "b").await.unwrap());
        assert!(matches!(
            store.get(&ctx, "b").await,
            Err(DomainError::NotFound { .. })
        ));
        assert_eq!(store.len().await, 2);
    }
}
