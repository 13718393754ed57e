//! Query rewriting ahead of retrieval

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::node::QueryBundle;
use crate::domain::{DomainError, QueryContext};

/// Rewrites a query into a new bundle; the input is never modified
#[async_trait]
pub trait QueryTransform: Send + Sync + Debug {
    async fn transform(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<QueryBundle, DomainError>;

    fn name(&self) -> &'static str;
}
