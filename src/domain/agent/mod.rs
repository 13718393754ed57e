//! Tool-using agent contracts

mod agent;
mod entity;

pub use agent::ChatAgent;
pub use entity::{AgentChatResponse, AgentConfig, ReasoningStep, ToolCallRecord, MAX_STEPS_MESSAGE};
