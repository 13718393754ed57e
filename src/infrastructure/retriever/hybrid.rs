//! Convex combination of several retrievers' normalized scores

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::domain::node::sort_scored_nodes;
use crate::domain::retriever::Retriever;
use crate::domain::{DomainError, QueryBundle, QueryContext, ScoredNode};

const WEIGHT_TOLERANCE: f32 = 1e-3;

/// Each component's scores are min-max normalized to [0, 1], then combined
/// with weights summing to one. A node missing from a component scores 0 there.
#[derive(Debug, Clone)]
pub struct HybridRetriever {
    components: Vec<(Arc<dyn Retriever>, f32)>,
    top_k: Option<usize>,
}

impl HybridRetriever {
    pub fn new(components: Vec<(Arc<dyn Retriever>, f32)>) -> Result<Self, DomainError> {
        if components.is_empty() {
            return Err(DomainError::bad_input("hybrid retriever needs at least one component"));
        }
        if components.iter().any(|(_, w)| *w < 0.0) {
            return Err(DomainError::invalid_config("hybrid weights must be non-negative"));
        }

        let total: f32 = components.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(DomainError::invalid_config(format!(
                "hybrid weights must sum to 1, got {}",
                total
            )));
        }

        Ok(Self {
            components,
            top_k: None,
        })
    }

    /// Two retrievers weighted `alpha` and `1 - alpha`
    pub fn pair(
        first: Arc<dyn Retriever>,
        second: Arc<dyn Retriever>,
        alpha: f32,
    ) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(DomainError::invalid_config("alpha must be in [0, 1]"));
        }
        Self::new(vec![(first, alpha), (second, 1.0 - alpha)])
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

fn normalize(nodes: &[ScoredNode]) -> Vec<f32> {
    let (min, max) = nodes.iter().fold((f32::MAX, f32::MIN), |(lo, hi), n| {
        (lo.min(n.score), hi.max(n.score))
    });
    let range = max - min;

    nodes
        .iter()
        .map(|n| if range > 0.0 { (n.score - min) / range } else { 1.0 })
        .collect()
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let results = try_join_all(
            self.components
                .iter()
                .map(|(retriever, _)| retriever.retrieve(ctx, query)),
        )
        .await?;

        // First-seen order keeps ties stable across runs
        let mut order: Vec<String> = Vec::new();
        let mut combined: HashMap<String, ScoredNode> = HashMap::new();

        for ((_, weight), nodes) in self.components.iter().zip(results) {
            let normalized = normalize(&nodes);
            for (node, norm) in nodes.into_iter().zip(normalized) {
                let entry = combined.entry(node.id().to_string()).or_insert_with(|| {
                    order.push(node.id().to_string());
                    ScoredNode::new(node.node.clone(), 0.0)
                });
                entry.score += weight * norm;
            }
        }

        let mut nodes: Vec<ScoredNode> = order
            .iter()
            .filter_map(|id| combined.remove(id))
            .collect();
        sort_scored_nodes(&mut nodes);
        if let Some(top_k) = self.top_k {
            nodes.truncate(top_k);
        }

        debug!(components = self.components.len(), returned = nodes.len(), "Hybrid retrieval complete");
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retriever::MockRetriever;

    #[tokio::test]
    async fn test_combines_normalized_scores() {
        let dense = Arc::new(MockRetriever::with_texts(&[("a", "A", 0.9), ("b", "B", 0.5)]));
        let sparse = Arc::new(MockRetriever::with_texts(&[("b", "B", 12.0), ("c", "C", 3.0)]));

        let retriever = HybridRetriever::pair(dense, sparse, 0.5).unwrap();
        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("q"))
            .await
            .unwrap();

        // a: 0.5*1, b: 0.5*0 + 0.5*1, c: 0
        let scores: Vec<(&str, f32)> = nodes.iter().map(|n| (n.id(), n.score)).collect();
        assert_eq!(scores, vec![("a", 0.5), ("b", 0.5), ("c", 0.0)]);
    }

    #[tokio::test]
    async fn test_component_error_fails_call() {
        let ok = Arc::new(MockRetriever::with_texts(&[("a", "A", 1.0)]));
        let failing =
            Arc::new(MockRetriever::default().with_error(DomainError::upstream("store", "down")));

        let retriever = HybridRetriever::pair(ok, failing, 0.3).unwrap();
        let result = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("q"))
            .await;

        assert!(matches!(result, Err(DomainError::Upstream { .. })));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let a: Arc<dyn Retriever> = Arc::new(MockRetriever::default());
        let b: Arc<dyn Retriever> = Arc::new(MockRetriever::default());

        let err = HybridRetriever::new(vec![(a.clone(), 0.7), (b, 0.7)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig { .. }));
        assert!(HybridRetriever::new(Vec::new()).is_err());
        assert!(HybridRetriever::new(vec![(a, 1.0)]).is_ok());
    }
}
