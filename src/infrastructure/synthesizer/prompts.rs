//! Prompt keys and variable sets shared by the synthesizers

use crate::domain::{DomainError, PromptTemplate};

pub const TEXT_QA_PROMPT_KEY: &str = "text_qa_template";
pub const REFINE_PROMPT_KEY: &str = "refine_template";
pub const SUMMARY_PROMPT_KEY: &str = "summary_template";
pub const SIMPLE_PROMPT_KEY: &str = "simple_template";

pub(super) const TEXT_QA_VARS: &[&str] = &["context_str", "query_str"];
pub(super) const REFINE_VARS: &[&str] = &["query_str", "existing_answer", "context_msg"];
pub(super) const SUMMARY_VARS: &[&str] = &["context_str", "query_str"];
pub(super) const SIMPLE_VARS: &[&str] = &["query_str"];

pub(super) fn render(template: &PromptTemplate, values: &[(&str, &str)]) -> Result<String, DomainError> {
    Ok(template.format(values)?)
}

/// True when there is nothing to synthesize from
pub(super) fn no_text(chunks: &[String]) -> bool {
    chunks.iter().all(|c| c.trim().is_empty())
}
