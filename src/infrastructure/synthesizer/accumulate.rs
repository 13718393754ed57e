//! Answers the query against each chunk separately and lists the answers

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use super::compact::Compactor;
use super::prompts::{render, TEXT_QA_PROMPT_KEY, TEXT_QA_VARS};
use crate::domain::llm::LlmProvider;
use crate::domain::prompt::defaults::text_qa_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, PromptTemplate, QueryContext, ResponseMode, EMPTY_RESPONSE};
use crate::infrastructure::predict::predict;

pub const DEFAULT_ACCUMULATE_SEPARATOR: &str = "\n---------------------\n";

#[derive(Debug, Clone)]
pub struct Accumulate {
    llm: Arc<dyn LlmProvider>,
    text_qa_template: PromptTemplate,
    compactor: Option<Compactor>,
    separator: String,
    use_async: bool,
}

impl Accumulate {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            text_qa_template: text_qa_prompt(),
            compactor: None,
            separator: DEFAULT_ACCUMULATE_SEPARATOR.to_string(),
            use_async: false,
        }
    }

    /// Packs chunks before answering: the `compact_accumulate` mode
    pub fn compact(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm).with_compactor(Compactor::default())
    }

    pub fn with_compactor(mut self, compactor: Compactor) -> Self {
        self.compactor = Some(compactor);
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_use_async(mut self, use_async: bool) -> Self {
        self.use_async = use_async;
        self
    }

    pub fn with_text_qa_template(mut self, template: PromptTemplate) -> Self {
        self.text_qa_template = template;
        self
    }
}

#[async_trait]
impl ResponseSynthesizer for Accumulate {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        let chunks: Vec<String> = match &self.compactor {
            Some(compactor) => compactor.compact(&self.text_qa_template, query_str, text_chunks),
            None => text_chunks
                .iter()
                .filter(|c| !c.trim().is_empty())
                .cloned()
                .collect(),
        };
        if chunks.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let prompts = chunks
            .iter()
            .map(|chunk| {
                render(
                    &self.text_qa_template,
                    &[("context_str", chunk.as_str()), ("query_str", query_str)],
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let component = self.mode().as_str();
        let answers = if self.use_async {
            try_join_all(
                prompts
                    .iter()
                    .map(|prompt| predict(self.llm.as_ref(), ctx, component, prompt)),
            )
            .await?
        } else {
            let mut answers = Vec::with_capacity(prompts.len());
            for prompt in &prompts {
                answers.push(predict(self.llm.as_ref(), ctx, component, prompt).await?);
            }
            answers
        };

        Ok(answers
            .iter()
            .enumerate()
            .map(|(i, answer)| format!("Response {}: {}", i + 1, answer))
            .collect::<Vec<_>>()
            .join(&self.separator))
    }

    fn mode(&self) -> ResponseMode {
        if self.compactor.is_some() {
            ResponseMode::CompactAccumulate
        } else {
            ResponseMode::Accumulate
        }
    }
}

impl PromptMixin for Accumulate {
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
