//! One LLM call over all chunks joined together

use std::sync::Arc;

use async_trait::async_trait;

use super::prompts::{no_text, render, TEXT_QA_PROMPT_KEY, TEXT_QA_VARS};
use crate::domain::llm::{LlmProvider, TextStream};
use crate::domain::prompt::defaults::text_qa_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, PromptTemplate, QueryContext, ResponseMode, EMPTY_RESPONSE};
use crate::infrastructure::predict::{predict, stream_predict};

#[derive(Debug, Clone)]
pub struct SimpleSummarize {
    llm: Arc<dyn LlmProvider>,
    text_qa_template: PromptTemplate,
}

impl SimpleSummarize {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            text_qa_template: text_qa_prompt(),
        }
    }

    pub fn with_text_qa_template(mut self, template: PromptTemplate) -> Self {
        self.text_qa_template = template;
        self
    }

    fn prompt(&self, query_str: &str, text_chunks: &[String]) -> Result<String, DomainError> {
        let context = text_chunks.join("\n\n");
        render(
            &self.text_qa_template,
            &[("context_str", context.as_str()), ("query_str", query_str)],
        )
    }
}

#[async_trait]
impl ResponseSynthesizer for SimpleSummarize {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        if no_text(text_chunks) {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let prompt = self.prompt(query_str, text_chunks)?;
        predict(self.llm.as_ref(), ctx, "simple_summarize", &prompt).await
    }

    async fn stream_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<TextStream, DomainError> {
        let prompt = self.prompt(query_str, text_chunks)?;
        stream_predict(self.llm.as_ref(), ctx, "simple_summarize", &prompt).await
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::SimpleSummarize
    }
}

impl PromptMixin for SimpleSummarize {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(TEXT_QA_PROMPT_KEY.to_string(), self.text_qa_template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, TEXT_QA_PROMPT_KEY, TEXT_QA_VARS)? {
            self.text_qa_template = template;
        }
        Ok(())
    }
}
