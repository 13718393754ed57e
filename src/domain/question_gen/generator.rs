use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::node::QueryBundle;
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryContext};

/// A sub-question routed to a named tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub sub_question: String,
    pub tool_name: String,
}

impl SubQuestion {
    pub fn new(tool_name: impl Into<String>, sub_question: impl Into<String>) -> Self {
        Self {
            sub_question: sub_question.into(),
            tool_name: tool_name.into(),
        }
    }
}

/// Produces sub-questions for a set of tools
#[async_trait]
pub trait QuestionGenerator: Send + Sync + Debug {
    async fn generate(
        &self,
        ctx: &QueryContext,
        tools: &[ToolMetadata],
        query: &QueryBundle,
    ) -> Result<Vec<SubQuestion>, DomainError>;
}
