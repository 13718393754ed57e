//! Tools backed by plain Rust closures

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::domain::tool::{Tool, ToolMetadata, ToolOutput};
use crate::domain::{DomainError, QueryContext};

type ToolFn = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;

/// Wraps an async closure taking the decoded arguments
#[derive(Clone)]
pub struct FunctionTool {
    metadata: ToolMetadata,
    func: ToolFn,
}

impl FunctionTool {
    pub fn new<F, Fut>(metadata: ToolMetadata, func: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self {
            metadata,
            func: Arc::new(move |input| func(input).boxed()),
        }
    }

    /// Wraps a synchronous closure
    pub fn from_fn<F>(metadata: ToolMetadata, func: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        Self::new(metadata, move |input| {
            let func = func.clone();
            async move { func(input) }
        })
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, ctx: &QueryContext, input: Value) -> Result<ToolOutput, DomainError> {
        let name = self.metadata.name.as_str();
        let content = ctx
            .run(async {
                (self.func)(input.clone())
                    .await
                    .map_err(|e| DomainError::upstream(name, format!("{:#}", e)))
            })
            .await?;

        Ok(ToolOutput::new(name, content).with_raw_input(input))
    }
}
