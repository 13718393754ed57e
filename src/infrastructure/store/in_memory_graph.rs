//! In-memory knowledge graph keyed by subject

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::node::Triplet;
use crate::domain::store::GraphStore;
use crate::domain::{DomainError, QueryContext};

#[derive(Debug, Default, Clone)]
pub struct InMemoryGraphStore {
    edges: Arc<RwLock<HashMap<String, Vec<(String, String)>>>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_triplets(triplets: Vec<Triplet>) -> Self {
        let store = Self::new();
        {
            let mut edges = store.edges.write().await;
            for triplet in triplets {
                insert_edge(&mut edges, triplet);
            }
        }
        store
    }

    /// Every subject with at least one outgoing edge
    pub async fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.edges.read().await.keys().cloned().collect();
        subjects.sort();
        subjects
    }
}

fn insert_edge(edges: &mut HashMap<String, Vec<(String, String)>>, triplet: Triplet) {
    let outgoing = edges.entry(triplet.subject).or_default();
    let edge = (triplet.relation, triplet.object);
    if !outgoing.contains(&edge) {
        outgoing.push(edge);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert(&self, ctx: &QueryContext, triplet: Triplet) -> Result<(), DomainError> {
        ctx.check()?;
        insert_edge(&mut *self.edges.write().await, triplet);
        Ok(())
    }

    async fn get(
        &self,
        ctx: &QueryContext,
        subject: &str,
    ) -> Result<Vec<(String, String)>, DomainError> {
        ctx.check()?;
        Ok(self
            .edges
            .read()
            .await
            .get(subject)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, ctx: &QueryContext, triplet: &Triplet) -> Result<bool, DomainError> {
        ctx.check()?;

        let mut edges = self.edges.write().await;
        let Some(outgoing) = edges.get_mut(&triplet.subject) else {
            return Ok(false);
        };

        let before = outgoing.len();
        outgoing.retain(|(relation, object)| {
            !(relation == &triplet.relation && object == &triplet.object)
        });
        let removed = outgoing.len() < before;

        if outgoing.is_empty() {
            edges.remove(&triplet.subject);
        }
        Ok(removed)
    }
}
