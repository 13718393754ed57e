//! Follows index nodes into the retrievers they point at

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::domain::node::{dedup_by_id, sort_scored_nodes, NodeKind};
use crate::domain::retriever::Retriever;
use crate::domain::{DomainError, QueryBundle, QueryContext, ScoredNode};

/// Retrieves from a root retriever; every index node whose `index_id` names a
/// registered child is replaced by that child's results for the same query.
/// Each child is visited at most once per call.
#[derive(Debug, Clone)]
pub struct ComposableRetriever {
    root: Arc<dyn Retriever>,
    children: HashMap<String, Arc<dyn Retriever>>,
}

impl ComposableRetriever {
    pub fn new(root: Arc<dyn Retriever>) -> Self {
        Self {
            root,
            children: HashMap::new(),
        }
    }

    pub fn with_child(mut self, index_id: impl Into<String>, retriever: Arc<dyn Retriever>) -> Self {
        self.children.insert(index_id.into(), retriever);
        self
    }

    fn expand<'a>(
        &'a self,
        ctx: &'a QueryContext,
        query: &'a QueryBundle,
        nodes: Vec<ScoredNode>,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Result<Vec<ScoredNode>, DomainError>> {
        async move {
            let mut out = Vec::with_capacity(nodes.len());

            for scored in nodes {
                if scored.node.kind() != NodeKind::Index {
                    out.push(scored);
                    continue;
                }

                let Some(index_id) = scored.node.metadata_str("index_id").map(String::from) else {
                    out.push(scored);
                    continue;
                };
                let Some(child) = self.children.get(&index_id) else {
                    warn!(index_id = %index_id, "Index node points at an unregistered retriever");
                    out.push(scored);
                    continue;
                };
                if !visited.insert(index_id.clone()) {
                    debug!(index_id = %index_id, "Skipping already visited index");
                    continue;
                }

                let child_nodes = child.retrieve(ctx, query).await?;
                out.extend(self.expand(ctx, query, child_nodes, visited).await?);
            }

            Ok(out)
        }
        .boxed()
    }
}

#[async_trait]
impl Retriever for ComposableRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let root_nodes = self.root.retrieve(ctx, query).await?;
        let mut visited = HashSet::new();

        let mut nodes = dedup_by_id(self.expand(ctx, query, root_nodes, &mut visited).await?);
        sort_scored_nodes(&mut nodes);
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "composable"
    }
}
