use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool invocation requested by an LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decoded arguments. Non-JSON or non-object payloads are wrapped as `{"input": ...}`.
    pub fn parsed_arguments(&self) -> Value {
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(Value::String(s)) => json!({ "input": s }),
            Ok(Value::Null) => json!({}),
            Ok(other) => json!({ "input": other }),
            Err(_) => json!({ "input": self.arguments.trim() }),
        }
    }
}

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: Option<String>,
    pub tool_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn new(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: None,
            tool_name: tool_name.into(),
            content: content.into(),
            raw_input: None,
            raw_output: None,
            is_error: false,
        }
    }

    pub fn error(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(tool_name, content)
        }
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn with_raw_input(mut self, input: Value) -> Self {
        self.raw_input = Some(input);
        self
    }

    pub fn with_raw_output(mut self, output: Value) -> Self {
        self.raw_output = Some(output);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_arguments_object() {
        let call = ToolCall::new("1", "add", r#"{"a": 1, "b": 2}"#);
        assert_eq!(call.parsed_arguments(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_parsed_arguments_wraps_plain_text() {
        let call = ToolCall::new("1", "search", "rust async traits");
        assert_eq!(call.parsed_arguments(), json!({"input": "rust async traits"}));

        let call = ToolCall::new("2", "search", r#""quoted""#);
        assert_eq!(call.parsed_arguments(), json!({"input": "quoted"}));
    }

    #[test]
    fn test_error_output_flag() {
        let output = ToolOutput::error("calc", "division by zero").with_call_id("abc");
        assert!(output.is_error);
        assert_eq!(output.tool_call_id.as_deref(), Some("abc"));
    }
}
