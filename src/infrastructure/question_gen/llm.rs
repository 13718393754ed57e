//! LLM question generator

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::llm::LlmProvider;
use crate::domain::prompt::defaults::sub_question_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::question_gen::{QuestionGenerator, SubQuestion};
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, PromptTemplate, QueryBundle, QueryContext};
use crate::infrastructure::predict::predict;
use crate::infrastructure::synthesizer::extract_json;

pub const SUB_QUESTION_PROMPT_KEY: &str = "question_gen_template";
const SUB_QUESTION_VARS: &[&str] = &["tools_str", "query_str"];

/// `[tool] question`, optionally behind a list marker
static TAGGED_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*]|\d+[.)])?\s*\[([^\]]+)\]\s*(.+?)\s*$").expect("tagged line regex is valid")
});

#[derive(Debug, Deserialize)]
struct JsonSubQuestion {
    sub_question: String,
    tool_name: String,
}

#[derive(Debug, Deserialize)]
struct JsonSubQuestions {
    items: Vec<JsonSubQuestion>,
}

/// Asks the LLM for `[tool_name] sub-question` lines.
///
/// Only pairs naming a known tool are kept, in the order they appear. When
/// nothing usable comes back the original query goes to the first tool.
#[derive(Debug, Clone)]
pub struct LlmQuestionGenerator {
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
}

impl LlmQuestionGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            template: sub_question_prompt(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Result<Self, DomainError> {
        template.check_variables(SUB_QUESTION_VARS)?;
        self.template = template;
        Ok(self)
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(
        &self,
        ctx: &QueryContext,
        tools: &[ToolMetadata],
        query: &QueryBundle,
    ) -> Result<Vec<SubQuestion>, DomainError> {
        let Some(first_tool) = tools.first() else {
            return Err(DomainError::bad_input("question generator needs at least one tool"));
        };

        let tools_str = tools
            .iter()
            .map(ToolMetadata::to_prompt_line)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = self.template.format(&[
            ("tools_str", tools_str.as_str()),
            ("query_str", query.query_str()),
        ])?;

        let output = predict(self.llm.as_ref(), ctx, "question_gen", &prompt).await?;
        let questions = parse_sub_questions(&output, tools);

        if questions.is_empty() {
            warn!(tool = %first_tool.name, "No sub-questions parsed, using the original query");
            return Ok(vec![SubQuestion::new(
                first_tool.name.clone(),
                query.query_str(),
            )]);
        }

        debug!(count = questions.len(), "Parsed sub-questions");
        Ok(questions)
    }
}

impl PromptMixin for LlmQuestionGenerator {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(SUB_QUESTION_PROMPT_KEY.to_string(), self.template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, SUB_QUESTION_PROMPT_KEY, SUB_QUESTION_VARS)? {
            self.template = template;
        }
        Ok(())
    }
}

/// Pairs naming a known tool, in output order. JSON output is accepted too.
pub fn parse_sub_questions(output: &str, tools: &[ToolMetadata]) -> Vec<SubQuestion> {
    let known = |name: &str| tools.iter().any(|t| t.name == name);

    let parsed: Vec<SubQuestion> = match parse_json(output) {
        Some(items) => items,
        None => output
            .lines()
            .filter_map(|line| TAGGED_LINE_PATTERN.captures(line))
            .map(|caps| SubQuestion::new(caps[1].trim(), &caps[2]))
            .collect(),
    };

    parsed
        .into_iter()
        .filter(|q| !q.sub_question.trim().is_empty() && known(&q.tool_name))
        .collect()
}

fn parse_json(output: &str) -> Option<Vec<SubQuestion>> {
    let json = extract_json(output)?;
    let items: Vec<JsonSubQuestion> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(_) => serde_json::from_str::<JsonSubQuestions>(json).ok()?.items,
    };

    Some(
        items
            .into_iter()
            .map(|item| SubQuestion::new(item.tool_name, item.sub_question))
            .collect(),
    )
}
