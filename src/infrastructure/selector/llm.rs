//! LLM-backed single and multi selectors

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::config::SelectorSettings;
use crate::domain::llm::LlmProvider;
use crate::domain::prompt::defaults::{multi_select_prompt, single_select_prompt};
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::selector::{Selector, SelectorResult, SingleSelection};
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, PromptTemplate, QueryBundle, QueryContext};
use crate::infrastructure::predict::predict;
use crate::infrastructure::synthesizer::extract_json;

pub const SELECT_PROMPT_KEY: &str = "select_template";
pub const DEFAULT_MAX_OUTPUTS: usize = 3;

const SINGLE_VARS: &[&str] = &["num_choices", "context_list", "query_str"];
const MULTI_VARS: &[&str] = &["num_choices", "context_list", "query_str", "max_outputs"];

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("number regex is valid"));

/// Asks the LLM to pick choices by their 1-based number.
///
/// The answer is read as a JSON list of `{"choice", "reason"}` objects when
/// possible, otherwise every number in the text is taken as a choice.
#[derive(Debug, Clone)]
pub struct LlmSelector {
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    max_outputs: usize,
    multi: bool,
}

impl LlmSelector {
    pub fn single(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            template: single_select_prompt(),
            max_outputs: 1,
            multi: false,
        }
    }

    pub fn multi(llm: Arc<dyn LlmProvider>, max_outputs: usize) -> Result<Self, DomainError> {
        if max_outputs == 0 {
            return Err(DomainError::invalid_config("max_outputs must be greater than 0"));
        }
        Ok(Self {
            llm,
            template: multi_select_prompt(),
            max_outputs,
            multi: true,
        })
    }

    pub fn from_settings(
        llm: Arc<dyn LlmProvider>,
        settings: &SelectorSettings,
    ) -> Result<Self, DomainError> {
        Self::multi(llm, settings.max_outputs)
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Result<Self, DomainError> {
        template.check_variables(self.supported_vars())?;
        self.template = template;
        Ok(self)
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    fn supported_vars(&self) -> &'static [&'static str] {
        if self.multi { MULTI_VARS } else { SINGLE_VARS }
    }

    fn prompt(&self, choices: &[ToolMetadata], query_str: &str) -> Result<String, DomainError> {
        let num_choices = choices.len().to_string();
        let max_outputs = self.max_outputs.to_string();
        let context_list = choices
            .iter()
            .enumerate()
            .map(|(i, choice)| format!("({}) {}", i + 1, choice.description))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(self.template.format(&[
            ("num_choices", num_choices.as_str()),
            ("context_list", context_list.as_str()),
            ("query_str", query_str),
            ("max_outputs", max_outputs.as_str()),
        ])?)
    }
}

#[async_trait]
impl Selector for LlmSelector {
    async fn select(
        &self,
        ctx: &QueryContext,
        choices: &[ToolMetadata],
        query: &QueryBundle,
    ) -> Result<SelectorResult, DomainError> {
        if choices.is_empty() {
            return Err(DomainError::bad_input("selector needs at least one choice"));
        }

        let prompt = self.prompt(choices, query.query_str())?;
        let output = predict(self.llm.as_ref(), ctx, "llm_selector", &prompt).await?;
        let result = parse_selection(&output, choices.len(), self.max_outputs)?;

        debug!(indices = ?result.indices(), multi = self.multi, "Selected choices");
        Ok(result)
    }
}

impl PromptMixin for LlmSelector {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(SELECT_PROMPT_KEY.to_string(), self.template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, SELECT_PROMPT_KEY, self.supported_vars())? {
            self.template = template;
        }
        Ok(())
    }
}

/// Reads 1-based choices out of an LLM answer and returns zero-based selections.
/// Out-of-range and repeated choices are dropped; at most `max_outputs` are kept.
pub fn parse_selection(
    output: &str,
    num_choices: usize,
    max_outputs: usize,
) -> Result<SelectorResult, DomainError> {
    let candidates = parse_json_answers(output).unwrap_or_else(|| parse_numbers(output));

    let mut selections: Vec<SingleSelection> = Vec::new();
    for (choice, reason) in candidates {
        if choice == 0 || choice > num_choices {
            continue;
        }
        if selections.iter().any(|s| s.index == choice - 1) {
            continue;
        }
        selections.push(SingleSelection::new(choice - 1, reason));
        if selections.len() == max_outputs {
            break;
        }
    }

    if selections.is_empty() {
        return Err(DomainError::parse_failed(format!(
            "no valid choice in selector output: {}",
            output.trim()
        )));
    }
    Ok(SelectorResult::new(selections))
}

fn parse_json_answers(output: &str) -> Option<Vec<(usize, String)>> {
    let value: Value = serde_json::from_str(extract_json(output)?).ok()?;
    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return None,
    };

    let answers: Vec<(usize, String)> = items
        .iter()
        .filter_map(|item| {
            let choice = match item.get("choice")? {
                Value::Number(n) => usize::try_from(n.as_u64()?).ok()?,
                Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            let reason = item
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some((choice, reason))
        })
        .collect();

    (!answers.is_empty()).then_some(answers)
}

fn parse_numbers(output: &str) -> Vec<(usize, String)> {
    output
        .lines()
        .flat_map(|line| {
            NUMBER_PATTERN
                .find_iter(line)
                .filter_map(|m| m.as_str().parse::<usize>().ok())
                .map(move |n| (n, line.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    fn choices() -> Vec<ToolMetadata> {
        vec![
            ToolMetadata::new("vector", "Useful for specific facts"),
            ToolMetadata::new("summary", "Useful for summaries"),
            ToolMetadata::new("sql", "Useful for aggregate numbers"),
        ]
    }

    #[tokio::test]
    async fn test_single_selector_parses_json() {
        let llm = Arc::new(
            MockLlmProvider::new("mock")
                .with_reply(r#"[{"choice": 2, "reason": "asks for a summary"}]"#),
        );
        let selector = LlmSelector::single(llm.clone());

        let result = selector
            .select(&QueryContext::background(), &choices(), &QueryBundle::new("Summarize it"))
            .await
            .unwrap();

        assert_eq!(result.indices(), vec![1]);
        assert_eq!(result.reasons(), vec!["asks for a summary"]);

        let prompts = llm.prompts();
        assert!(prompts[0].contains("(1 to 3)"));
        assert!(prompts[0].contains("(2) Useful for summaries"));
        assert!(prompts[0].contains("'Summarize it'"));
    }

    #[tokio::test]
    async fn test_multi_selector_respects_max_outputs() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"Sure: [{"choice": 3, "reason": "a"}, {"choice": 1, "reason": "b"}, {"choice": 2, "reason": "c"}]"#,
        ));
        let selector = LlmSelector::multi(llm, 2).unwrap();

        let result = selector
            .select(&QueryContext::background(), &choices(), &QueryBundle::new("q"))
            .await
            .unwrap();

        assert_eq!(result.indices(), vec![2, 0]);
    }

    #[test]
    fn test_number_fallback() {
        let result = parse_selection("I would pick choice 3, then 3 again and 1", 3, 5).unwrap();
        assert_eq!(result.indices(), vec![2, 0]);
    }

    #[test]
    fn test_string_choice_in_json() {
        let result = parse_selection(r#"{"choice": "1", "reason": "only"}"#, 2, 1).unwrap();
        assert_eq!(result.indices(), vec![0]);
    }

    #[test]
    fn test_unparseable_output_fails() {
        let err = parse_selection("none of them fit", 3, 1).unwrap_err();
        assert!(matches!(err, DomainError::ParseFailed { .. }));

        let err = parse_selection("choice 7", 3, 1).unwrap_err();
        assert!(matches!(err, DomainError::ParseFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("1"));
        let selector = LlmSelector::single(llm.clone());

        let err = selector
            .select(&QueryContext::background(), &[], &QueryBundle::new("q"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::BadInput { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_prompt_update_checks_variables() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        let mut selector = LlmSelector::single(llm);

        let bad = PromptDictionary::from([(
            SELECT_PROMPT_KEY.to_string(),
            PromptTemplate::new("{max_outputs} {query_str}"),
        )]);
        assert!(selector.update_prompts(bad).is_err());

        let good = PromptDictionary::from([(
            SELECT_PROMPT_KEY.to_string(),
            PromptTemplate::new("Pick from {context_list} for {query_str}"),
        )]);
        selector.update_prompts(good).unwrap();
        assert_eq!(
            selector.get_prompts()[SELECT_PROMPT_KEY].content(),
            "Pick from {context_list} for {query_str}"
        );
    }
}
