//! Prompt template parsing and rendering
//!
//! Variables are written `{name}`. A literal brace is written `{{` or `}}`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::domain::DomainError;

/// Matches escaped braces first so that `{{name}}` renders as `{name}`
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Unknown variable '{name}' (supported: {supported})")]
    UnknownVariable { name: String, supported: String },
}

impl From<TemplateError> for DomainError {
    fn from(err: TemplateError) -> Self {
        DomainError::invalid_config(err.to_string())
    }
}

/// A prompt template with optional pre-filled (partial) variables
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    content: String,
    variables: Vec<String>,
    partials: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut variables: Vec<String> = Vec::new();

        for cap in PLACEHOLDER_PATTERN.captures_iter(&content) {
            if let Some(name) = cap.get(1) {
                let name = name.as_str();
                if !variables.iter().any(|v| v == name) {
                    variables.push(name.to_string());
                }
            }
        }

        Self {
            content,
            variables,
            partials: HashMap::new(),
        }
    }

    /// Get the original template content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// All variables in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Variables not already filled by `partial_format`
    pub fn required_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| !self.partials.contains_key(*v))
            .map(String::as_str)
            .collect()
    }

    /// Returns a copy with some variables pre-filled
    pub fn partial_format(&self, values: &[(&str, &str)]) -> Self {
        let mut template = self.clone();
        for (name, value) in values {
            template
                .partials
                .insert((*name).to_string(), (*value).to_string());
        }
        template
    }

    /// Returns a copy with `suffix` appended; existing partials are kept
    pub fn append(&self, suffix: &str) -> Self {
        let mut template = Self::new(format!("{}{}", self.content, suffix));
        template.partials = self.partials.clone();
        template
    }

    /// Verifies that every unfilled variable is one the caller will supply
    pub fn check_variables(&self, supported: &[&str]) -> Result<(), TemplateError> {
        match self
            .required_variables()
            .into_iter()
            .find(|v| !supported.contains(v))
        {
            Some(name) => Err(TemplateError::UnknownVariable {
                name: name.to_string(),
                supported: supported.join(", "),
            }),
            None => Ok(()),
        }
    }

    /// Render with `(name, value)` pairs; partials fill the gaps
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let lookup = |name: &str| -> Option<String> {
            values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .or_else(|| self.partials.get(name).cloned())
        };

        if let Some(missing) = self.variables.iter().find(|v| lookup(v.as_str()).is_none()) {
            return Err(TemplateError::MissingVariable {
                name: missing.clone(),
            });
        }

        let rendered = PLACEHOLDER_PATTERN.replace_all(&self.content, |caps: &Captures| {
            match caps.get(1) {
                Some(name) => lookup(name.as_str()).unwrap_or_default(),
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            }
        });

        Ok(rendered.into_owned())
    }

    /// Render with an owned map of values
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, TemplateError> {
        let pairs: Vec<(&str, &str)> = values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.format(&pairs)
    }
}

impl From<&str> for PromptTemplate {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for PromptTemplate {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_variables() {
        let template = PromptTemplate::new("Hello, world!");
        assert!(template.variables().is_empty());
        assert_eq!(template.format(&[]).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_variables_in_order_without_duplicates() {
        let template = PromptTemplate::new("{query_str} / {context_str} / {query_str}");
        assert_eq!(template.variables(), &["query_str", "context_str"]);
    }

    #[test]
    fn test_format() {
        let template = PromptTemplate::new("Context: {context_str}\nQuery: {query_str}");

        let rendered = template
            .format(&[("query_str", "why?"), ("context_str", "because")])
            .unwrap();

        assert_eq!(rendered, "Context: because\nQuery: why?");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::new(r#"Answer as {{"choice": 1}} for {query_str}"#);

        assert_eq!(template.variables(), &["query_str"]);
        assert_eq!(
            template.format(&[("query_str", "q")]).unwrap(),
            r#"Answer as {"choice": 1} for q"#
        );
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::new("Hello {name}");
        let err = template.format(&[]).unwrap_err();

        assert_eq!(
            err,
            TemplateError::MissingVariable {
                name: "name".to_string()
            }
        );
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let template = PromptTemplate::new("{a}");
        assert_eq!(template.format(&[("a", "{b}")]).unwrap(), "{b}");
    }

    #[test]
    fn test_partial_format() {
        let template = PromptTemplate::new("{greeting}, {name}!").partial_format(&[("greeting", "Hi")]);

        assert_eq!(template.required_variables(), vec!["name"]);
        assert_eq!(template.format(&[("name", "there")]).unwrap(), "Hi, there!");
        assert_eq!(
            template
                .format(&[("greeting", "Hello"), ("name", "you")])
                .unwrap(),
            "Hello, you!"
        );
    }

    #[test]
    fn test_check_variables() {
        let template = PromptTemplate::new("{context_str} {query_str}");

        assert!(template.check_variables(&["context_str", "query_str"]).is_ok());

        let err = template.check_variables(&["query_str"]).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownVariable { .. }));
        assert!(DomainError::from(err).to_string().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_render_with_map() {
        let mut values = HashMap::new();
        values.insert("x".to_string(), "1".to_string());

        assert_eq!(PromptTemplate::new("x={x}").render(&values).unwrap(), "x=1");
    }

    #[test]
    fn test_append_keeps_partials() {
        let template = PromptTemplate::new("Hi {name}.")
            .partial_format(&[("name", "Ada")])
            .append(" Schema: {schema}");

        assert_eq!(template.variables(), &["name", "schema"]);
        assert_eq!(template.required_variables(), vec!["schema"]);
        assert_eq!(template.format(&[("schema", "{}")]).unwrap(), "Hi Ada. Schema: {}");
    }
}
