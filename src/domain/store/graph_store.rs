use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::node::Triplet;
use crate::domain::{DomainError, QueryContext};

/// Directed knowledge graph of (subject, relation, object) triplets
#[async_trait]
pub trait GraphStore: Send + Sync + Debug {
    /// Inserts a triplet; inserting an existing triplet is a no-op
    async fn upsert(&self, ctx: &QueryContext, triplet: Triplet) -> Result<(), DomainError>;

    /// Outgoing (relation, object) pairs of `subject`, in insertion order
    async fn get(
        &self,
        ctx: &QueryContext,
        subject: &str,
    ) -> Result<Vec<(String, String)>, DomainError>;

    /// Removes a triplet; returns whether it existed
    async fn delete(&self, ctx: &QueryContext, triplet: &Triplet) -> Result<bool, DomainError>;
}
