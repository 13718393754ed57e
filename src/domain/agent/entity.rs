use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Appended as the final assistant message when the iteration cap is hit
pub const MAX_STEPS_MESSAGE: &str = "Agent stopped: max steps reached.";

/// Agent loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reasoning iterations (LLM calls) per user turn
    pub max_iterations: usize,
    /// Extra instructions; placed ahead of the tool protocol for non tool-calling LLMs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Log every step at info level instead of debug
    #[serde(default)]
    pub verbose: bool,
}

impl AgentConfig {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_iterations == 0 {
            return Err(DomainError::invalid_config(
                "max_iterations must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            system_prompt: None,
            verbose: false,
        }
    }
}

/// One executed (or attempted) tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub input: Value,
    pub output: String,
    pub is_error: bool,
}

/// Result of one agent turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChatResponse {
    pub response: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// LLM calls made during the turn
    pub iterations: usize,
    /// True when the turn ended at the iteration cap
    pub hit_max_iterations: bool,
}

impl std::fmt::Display for AgentChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.response)
    }
}

/// What an LLM reply in the textual protocol asks for
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningStep {
    Action {
        thought: Option<String>,
        tool_name: String,
        input: Value,
    },
    Answer {
        thought: Option<String>,
        answer: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(AgentConfig::default().validate().is_ok());
        assert!(AgentConfig::new(0).validate().is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = AgentConfig::new(3)
            .with_system_prompt("be brief")
            .with_verbose(true);

        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        assert!(config.verbose);
    }
}
