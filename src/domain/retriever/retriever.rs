use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::node::{QueryBundle, ScoredNode};
use crate::domain::{DomainError, QueryContext};

/// Maps a query to scored nodes, ordered by descending score
#[async_trait]
pub trait Retriever: Send + Sync + Debug {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError>;

    /// Short name used in logs and provenance metadata
    fn retriever_name(&self) -> &'static str {
        "retriever"
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::node::Node;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed node list and records every query
    #[derive(Debug, Default)]
    pub struct MockRetriever {
        nodes: Vec<ScoredNode>,
        error: Option<DomainError>,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl MockRetriever {
        pub fn new(nodes: Vec<ScoredNode>) -> Self {
            Self {
                nodes,
                ..Self::default()
            }
        }

        /// Convenience: `(id, content, score)` triples
        pub fn with_texts(items: &[(&str, &str, f32)]) -> Self {
            Self::new(
                items
                    .iter()
                    .map(|(id, text, score)| ScoredNode::new(Node::with_id(*id, *text), *score))
                    .collect(),
            )
        }

        pub fn with_error(mut self, error: DomainError) -> Self {
            self.error = Some(error);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Retriever for MockRetriever {
        async fn retrieve(
            &self,
            ctx: &QueryContext,
            query: &QueryBundle,
        ) -> Result<Vec<ScoredNode>, DomainError> {
            ctx.check()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries
                .lock()
                .unwrap()
                .push(query.query_str().to_string());

            match &self.error {
                Some(err) => Err(err.clone()),
                None => Ok(self.nodes.clone()),
            }
        }

        fn retriever_name(&self) -> &'static str {
            "mock"
        }
    }
}
