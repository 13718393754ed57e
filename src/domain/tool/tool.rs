use async_trait::async_trait;
use serde_json::Value;

use super::{ToolMetadata, ToolOutput};
use crate::domain::{DomainError, QueryContext};

#[cfg(test)]
use mockall::automock;

/// Anything an agent can call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    /// Executes the tool with decoded arguments
    async fn call(&self, ctx: &QueryContext, input: Value) -> Result<ToolOutput, DomainError>;
}
