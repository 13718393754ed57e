use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::node::{MetadataFilter, Node};
use crate::domain::{DomainError, QueryContext};

/// Nearest-neighbour query against a vector store
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStoreQuery {
    pub embedding: Vec<f32>,
    pub top_k: usize,
    pub filters: Option<MetadataFilter>,
}

impl VectorStoreQuery {
    pub fn new(embedding: Vec<f32>, top_k: usize) -> Self {
        Self {
            embedding,
            top_k,
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: Option<MetadataFilter>) -> Self {
        self.filters = filters;
        self
    }
}

/// A node id with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// Stores embedded nodes and answers similarity queries
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Adds nodes, which must carry embeddings; returns their ids.
    /// An id already bound to different content is rejected with `BadInput`.
    async fn add(&self, ctx: &QueryContext, nodes: Vec<Node>) -> Result<Vec<String>, DomainError>;

    /// Scored ids, most similar first, at most `top_k`
    async fn query(
        &self,
        ctx: &QueryContext,
        query: &VectorStoreQuery,
    ) -> Result<Vec<ScoredId>, DomainError>;

    /// Fetches a node by id; `NotFound` when absent
    async fn get(&self, ctx: &QueryContext, id: &str) -> Result<Node, DomainError>;

    /// Removes a node; returns whether it existed
    async fn delete(&self, ctx: &QueryContext, id: &str) -> Result<bool, DomainError>;

    fn store_type(&self) -> &'static str;
}
