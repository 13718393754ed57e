//! Exposes query engines and retrievers as agent tools

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::query_engine::QueryEngine;
use crate::domain::retriever::Retriever;
use crate::domain::tool::{Tool, ToolMetadata, ToolOutput};
use crate::domain::{DomainError, QueryBundle, QueryContext};

/// The `input` argument, or the whole payload when it is a bare string
pub(crate) fn input_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("input") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => input.to_string(),
        },
        other => other.to_string(),
    }
}

/// Answers the tool input with a query engine
#[derive(Debug, Clone)]
pub struct QueryEngineTool {
    engine: Arc<dyn QueryEngine>,
    metadata: ToolMetadata,
}

impl QueryEngineTool {
    pub fn new(engine: Arc<dyn QueryEngine>, metadata: ToolMetadata) -> Self {
        Self { engine, metadata }
    }

    pub fn from_defaults(
        engine: Arc<dyn QueryEngine>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(engine, ToolMetadata::new(name, description))
    }

    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }
}

#[async_trait]
impl Tool for QueryEngineTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, ctx: &QueryContext, input: Value) -> Result<ToolOutput, DomainError> {
        let query = input_text(&input);
        let response = self.engine.query(ctx, &QueryBundle::new(query)).await?;

        let raw_output = serde_json::to_value(&response).ok();
        let mut output = ToolOutput::new(self.metadata.name.clone(), response.response)
            .with_raw_input(input);
        if let Some(raw) = raw_output {
            output = output.with_raw_output(raw);
        }
        Ok(output)
    }
}

/// Returns the retrieved node texts, separated by blank lines
#[derive(Debug, Clone)]
pub struct RetrieverTool {
    retriever: Arc<dyn Retriever>,
    metadata: ToolMetadata,
}

impl RetrieverTool {
    pub fn new(retriever: Arc<dyn Retriever>, metadata: ToolMetadata) -> Self {
        Self {
            retriever,
            metadata,
        }
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, ctx: &QueryContext, input: Value) -> Result<ToolOutput, DomainError> {
        let query = input_text(&input);
        let nodes = self.retriever.retrieve(ctx, &QueryBundle::new(query)).await?;

        let content = nodes
            .iter()
            .map(|n| n.content())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ToolOutput::new(self.metadata.name.clone(), content).with_raw_input(input))
    }
}
