use async_trait::async_trait;

use crate::domain::transform::QueryTransform;
use crate::domain::{DomainError, QueryBundle, QueryContext};

/// Returns the query unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

#[async_trait]
impl QueryTransform for IdentityTransform {
    async fn transform(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<QueryBundle, DomainError> {
        ctx.check()?;
        Ok(query.clone())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}
