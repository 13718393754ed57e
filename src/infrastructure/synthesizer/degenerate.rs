//! Modes that skip chunk reduction: generation, no-text and context-only

use std::sync::Arc;

use async_trait::async_trait;

use super::prompts::{render, SIMPLE_PROMPT_KEY, SIMPLE_VARS};
use crate::domain::llm::{LlmProvider, TextStream};
use crate::domain::prompt::defaults::simple_input_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, PromptTemplate, QueryContext, ResponseMode};
use crate::infrastructure::predict::{predict, stream_predict};

/// Answers from the query alone; chunks are ignored
#[derive(Debug, Clone)]
pub struct Generation {
    llm: Arc<dyn LlmProvider>,
    simple_template: PromptTemplate,
}

impl Generation {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            simple_template: simple_input_prompt(),
        }
    }

    pub fn with_simple_template(mut self, template: PromptTemplate) -> Self {
        self.simple_template = template;
        self
    }
}

#[async_trait]
impl ResponseSynthesizer for Generation {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        _text_chunks: &[String],
    ) -> Result<String, DomainError> {
        let prompt = render(&self.simple_template, &[("query_str", query_str)])?;
        predict(self.llm.as_ref(), ctx, "generation", &prompt).await
    }

    async fn stream_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        _text_chunks: &[String],
    ) -> Result<TextStream, DomainError> {
        let prompt = render(&self.simple_template, &[("query_str", query_str)])?;
        stream_predict(self.llm.as_ref(), ctx, "generation", &prompt).await
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::Generation
    }
}

impl PromptMixin for Generation {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(SIMPLE_PROMPT_KEY.to_string(), self.simple_template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, SIMPLE_PROMPT_KEY, SIMPLE_VARS)? {
            self.simple_template = template;
        }
        Ok(())
    }
}

/// Returns the sources without any answer text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoText;

#[async_trait]
impl ResponseSynthesizer for NoText {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        _query_str: &str,
        _text_chunks: &[String],
    ) -> Result<String, DomainError> {
        ctx.check()?;
        Ok(String::new())
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::NoText
    }
}

/// Returns the retrieved text itself, chunks separated by blank lines
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOnly;

#[async_trait]
impl ResponseSynthesizer for ContextOnly {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        _query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        ctx.check()?;
        Ok(text_chunks.join("\n\n"))
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::ContextOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::{Node, QueryBundle, ScoredNode, EMPTY_RESPONSE};

    fn nodes() -> Vec<ScoredNode> {
        vec![
            ScoredNode::new(Node::with_id("a", "alpha"), 0.9),
            ScoredNode::new(Node::with_id("b", "beta"), 0.5),
        ]
    }

    #[tokio::test]
    async fn test_generation_ignores_context() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("from memory"));
        let synthesizer = Generation::new(llm.clone());

        let response = synthesizer
            .synthesize(&QueryContext::background(), &QueryBundle::new("tell me"), nodes())
            .await
            .unwrap();

        assert_eq!(response.text(), "from memory");
        assert_eq!(llm.prompts(), vec!["tell me".to_string()]);
        assert_eq!(response.source_nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_no_text_keeps_sources() {
        let response = NoText
            .synthesize(&QueryContext::background(), &QueryBundle::new("q"), nodes())
            .await
            .unwrap();

        assert_eq!(response.text(), EMPTY_RESPONSE);
        assert_eq!(response.source_nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_context_only_concatenates() {
        let response = ContextOnly
            .synthesize(&QueryContext::background(), &QueryBundle::new("q"), nodes())
            .await
            .unwrap();

        assert_eq!(response.text(), "alpha\n\nbeta");
    }

    #[tokio::test]
    async fn test_empty_nodes_give_empty_response() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        let synthesizers: Vec<Box<dyn ResponseSynthesizer>> = vec![
            Box::new(Generation::new(llm.clone())),
            Box::new(NoText),
            Box::new(ContextOnly),
        ];

        for synthesizer in synthesizers {
            let response = synthesizer
                .synthesize(&QueryContext::background(), &QueryBundle::new("q"), Vec::new())
                .await
                .unwrap();
            assert_eq!(response.text(), EMPTY_RESPONSE);
        }
        assert_eq!(llm.call_count(), 0);
    }
}
