//! Routes a query to the retrievers a selector picks

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::info;

use crate::domain::node::{dedup_by_id, sort_scored_nodes};
use crate::domain::retriever::Retriever;
use crate::domain::selector::Selector;
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryBundle, QueryContext, ScoredNode};

/// Metadata key naming the retriever a node came from
pub const RETRIEVER_METADATA_KEY: &str = "retriever";

/// Fans out to the selected retrievers and merges their results. Each node is
/// tagged with the name of the retriever that produced it.
#[derive(Debug, Clone)]
pub struct RouterRetriever {
    retrievers: Vec<(Arc<dyn Retriever>, ToolMetadata)>,
    choices: Vec<ToolMetadata>,
    selector: Arc<dyn Selector>,
}

impl RouterRetriever {
    pub fn new(
        retrievers: Vec<(Arc<dyn Retriever>, ToolMetadata)>,
        selector: Arc<dyn Selector>,
    ) -> Result<Self, DomainError> {
        if retrievers.is_empty() {
            return Err(DomainError::bad_input("router retriever needs at least one retriever"));
        }

        let choices = retrievers.iter().map(|(_, meta)| meta.clone()).collect();
        Ok(Self {
            retrievers,
            choices,
            selector,
        })
    }
}

/// Validates selector output against the number of choices
pub(crate) fn checked_indices(indices: Vec<usize>, len: usize) -> Result<Vec<usize>, DomainError> {
    if indices.is_empty() {
        return Err(DomainError::routing_failed("selector returned no choices"));
    }
    if let Some(bad) = indices.iter().find(|i| **i >= len) {
        return Err(DomainError::routing_failed(format!(
            "selector returned index {} for {} choices",
            bad, len
        )));
    }

    let mut unique = Vec::with_capacity(indices.len());
    for index in indices {
        if !unique.contains(&index) {
            unique.push(index);
        }
    }
    Ok(unique)
}

#[async_trait]
impl Retriever for RouterRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let selection = ctx.run(self.selector.select(ctx, &self.choices, query)).await?;
        let indices = checked_indices(selection.indices(), self.retrievers.len())?;

        info!(
            selected = ?indices.iter().map(|i| self.choices[*i].name.as_str()).collect::<Vec<_>>(),
            "Routing retrieval"
        );

        let results = try_join_all(indices.iter().map(|i| {
            let (retriever, meta) = &self.retrievers[*i];
            async move {
                let nodes = retriever.retrieve(ctx, query).await?;
                Ok::<_, DomainError>(
                    nodes
                        .into_iter()
                        .map(|mut n| {
                            n.node = n
                                .node
                                .with_metadata(RETRIEVER_METADATA_KEY, meta.name.clone());
                            n
                        })
                        .collect::<Vec<_>>(),
                )
            }
        }))
        .await?;

        let mut nodes = dedup_by_id(results.into_iter().flatten().collect());
        sort_scored_nodes(&mut nodes);
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "router"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retriever::MockRetriever;
    use crate::domain::selector::FixedSelector;

    fn tools() -> Vec<(Arc<dyn Retriever>, ToolMetadata)> {
        vec![
            (
                Arc::new(MockRetriever::with_texts(&[("a", "A", 0.4)])) as Arc<dyn Retriever>,
                ToolMetadata::new("docs", "Product documentation"),
            ),
            (
                Arc::new(MockRetriever::with_texts(&[("b", "B", 0.9), ("a", "A", 0.3)])),
                ToolMetadata::new("faq", "Frequently asked questions"),
            ),
        ]
    }

    #[tokio::test]
    async fn test_merges_selected_with_provenance() {
        let router = RouterRetriever::new(tools(), Arc::new(FixedSelector::new(vec![0, 1]))).unwrap();

        let nodes = router
            .retrieve(&QueryContext::background(), &QueryBundle::new("q"))
            .await
            .unwrap();

        let tagged: Vec<(&str, Option<&str>)> = nodes
            .iter()
            .map(|n| (n.id(), n.node.metadata_str(RETRIEVER_METADATA_KEY)))
            .collect();
        assert_eq!(tagged, vec![("b", Some("faq")), ("a", Some("docs"))]);
    }

    #[tokio::test]
    async fn test_empty_selection_fails() {
        let router = RouterRetriever::new(tools(), Arc::new(FixedSelector::new(vec![]))).unwrap();

        let err = router
            .retrieve(&QueryContext::background(), &QueryBundle::new("q"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::RoutingFailed { .. }));
    }

    #[test]
    fn test_empty_tool_list_rejected() {
        let err = RouterRetriever::new(Vec::new(), Arc::new(FixedSelector::new(vec![0]))).unwrap_err();
        assert!(matches!(err, DomainError::BadInput { .. }));
    }

    #[test]
    fn test_checked_indices() {
        assert_eq!(checked_indices(vec![1, 0, 1], 2).unwrap(), vec![1, 0]);
        assert!(checked_indices(vec![2], 2).is_err());
    }
}
