//! Bottom-up tree summarization

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use super::compact::{merge_pairs, Compactor};
use super::prompts::{no_text, render, SUMMARY_PROMPT_KEY, SUMMARY_VARS};
use crate::domain::llm::{LlmProvider, LlmRequest, LlmResponseFormat, TextStream};
use crate::domain::prompt::defaults::tree_summarize_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, PromptTemplate, QueryContext, ResponseMode, EMPTY_RESPONSE};
use crate::infrastructure::predict::{predict, predict_chat, stream_predict};

const COMPONENT: &str = "tree_summarize";

/// Packs chunks, summarizes each pack, and repeats on the summaries until one
/// pack remains. Every level is strictly shorter than the one before.
#[derive(Debug, Clone)]
pub struct TreeSummarize {
    llm: Arc<dyn LlmProvider>,
    summary_template: PromptTemplate,
    compactor: Compactor,
    use_async: bool,
    output_format: Option<LlmResponseFormat>,
}

impl TreeSummarize {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            summary_template: tree_summarize_prompt(),
            compactor: Compactor::default(),
            use_async: false,
            output_format: None,
        }
    }

    pub fn with_summary_template(mut self, template: PromptTemplate) -> Self {
        self.summary_template = template;
        self
    }

    pub fn with_compactor(mut self, compactor: Compactor) -> Self {
        self.compactor = compactor;
        self
    }

    /// Summarize the packs of one level concurrently
    pub fn with_use_async(mut self, use_async: bool) -> Self {
        self.use_async = use_async;
        self
    }

    /// Format requested for the root call when the LLM has a native JSON mode
    pub fn with_output_format(mut self, format: LlmResponseFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn summary_template(&self) -> &PromptTemplate {
        &self.summary_template
    }

    fn prompt(&self, query_str: &str, context: &str) -> Result<String, DomainError> {
        render(
            &self.summary_template,
            &[("context_str", context), ("query_str", query_str)],
        )
    }

    async fn summarize_level(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        chunks: &[String],
    ) -> Result<Vec<String>, DomainError> {
        let prompts = chunks
            .iter()
            .map(|chunk| self.prompt(query_str, chunk))
            .collect::<Result<Vec<_>, _>>()?;

        if self.use_async {
            try_join_all(
                prompts
                    .iter()
                    .map(|prompt| predict(self.llm.as_ref(), ctx, COMPONENT, prompt)),
            )
            .await
        } else {
            let mut summaries = Vec::with_capacity(prompts.len());
            for prompt in &prompts {
                ctx.check()?;
                summaries.push(predict(self.llm.as_ref(), ctx, COMPONENT, prompt).await?);
            }
            Ok(summaries)
        }
    }

    async fn answer(&self, ctx: &QueryContext, prompt: &str) -> Result<String, DomainError> {
        match &self.output_format {
            Some(format) if self.llm.supports_json_mode() => {
                let request = LlmRequest::builder()
                    .user(prompt)
                    .response_format(format.clone())
                    .build();
                let response = predict_chat(self.llm.as_ref(), ctx, COMPONENT, request).await?;
                Ok(response.content().to_string())
            }
            _ => predict(self.llm.as_ref(), ctx, COMPONENT, prompt).await,
        }
    }

    /// Reduces the chunks to the single context of the final call
    async fn reduce(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<Option<String>, DomainError> {
        let mut chunks = self
            .compactor
            .compact(&self.summary_template, query_str, text_chunks);
        let mut level = 0;

        while chunks.len() > 1 {
            ctx.check()?;
            let summaries = self.summarize_level(ctx, query_str, &chunks).await?;

            let packed = self
                .compactor
                .compact(&self.summary_template, query_str, &summaries);
            chunks = if packed.len() < chunks.len() {
                packed
            } else {
                merge_pairs(summaries)
            };

            level += 1;
            debug!(level, remaining = chunks.len(), "Tree level summarized");
        }

        Ok(chunks.pop())
    }
}

#[async_trait]
impl ResponseSynthesizer for TreeSummarize {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        match self.reduce(ctx, query_str, text_chunks).await? {
            Some(context) => {
                let prompt = self.prompt(query_str, &context)?;
                ctx.check()?;
                self.answer(ctx, &prompt).await
            }
            None => Ok(EMPTY_RESPONSE.to_string()),
        }
    }

    async fn stream_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<TextStream, DomainError> {
        if no_text(text_chunks) {
            return Ok(Box::pin(futures::stream::iter(vec![Ok(EMPTY_RESPONSE.to_string())])));
        }

        let context = self
            .reduce(ctx, query_str, text_chunks)
            .await?
            .unwrap_or_default();
        let prompt = self.prompt(query_str, &context)?;
        stream_predict(self.llm.as_ref(), ctx, COMPONENT, &prompt).await
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::TreeSummarize
    }
}

impl PromptMixin for TreeSummarize {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(SUMMARY_PROMPT_KEY.to_string(), self.summary_template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, SUMMARY_PROMPT_KEY, SUMMARY_VARS)? {
            self.summary_template = template;
        }
        Ok(())
    }
}
