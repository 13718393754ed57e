use async_trait::async_trait;
use std::fmt::Debug;

use super::AgentChatResponse;
use crate::domain::llm::Message;
use crate::domain::{DomainError, QueryContext};

/// A conversational agent that keeps history between turns
#[async_trait]
pub trait ChatAgent: Send + Sync + Debug {
    /// Runs one user turn to completion
    async fn chat(&self, ctx: &QueryContext, message: &str)
        -> Result<AgentChatResponse, DomainError>;

    /// Clears the conversation; a cancelled context leaves it untouched
    async fn reset(&self, ctx: &QueryContext) -> Result<(), DomainError>;

    /// Snapshot of the conversation so far
    async fn history(&self) -> Vec<Message>;
}
