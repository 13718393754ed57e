use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name, description and argument schema of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments
    pub parameters: Value,
    /// When set, the agent returns the tool output as the final answer
    #[serde(default)]
    pub return_direct: bool,
}

impl ToolMetadata {
    /// Metadata with the default single `input` string argument
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: default_parameters(),
            return_direct: false,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Derives the argument schema from a Rust type
    pub fn with_parameters_for<T: JsonSchema>(mut self) -> Self {
        let schema = schemars::schema_for!(T);
        self.parameters = serde_json::to_value(schema).unwrap_or_else(|_| default_parameters());
        self
    }

    pub fn with_return_direct(mut self, return_direct: bool) -> Self {
        self.return_direct = return_direct;
        self
    }

    /// One-line description used in selector and planner prompts
    pub fn to_prompt_line(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

fn default_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "input": { "type": "string" }
        },
        "required": ["input"]
    })
}
