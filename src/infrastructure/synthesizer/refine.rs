//! Iterative refinement: answer from the first chunk, then revise chunk by chunk

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::compact::Compactor;
use super::prompts::{
    no_text, render, REFINE_PROMPT_KEY, REFINE_VARS, TEXT_QA_PROMPT_KEY, TEXT_QA_VARS,
};
use crate::domain::llm::{LlmProvider, TextStream};
use crate::domain::prompt::defaults::{refine_prompt, text_qa_prompt};
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, PromptTemplate, QueryContext, ResponseMode, EMPTY_RESPONSE};
use crate::infrastructure::predict::{predict, stream_predict};

/// One LLM call per chunk. With a compactor set, chunks are packed first,
/// which is the `compact` mode.
#[derive(Debug, Clone)]
pub struct Refine {
    llm: Arc<dyn LlmProvider>,
    text_qa_template: PromptTemplate,
    refine_template: PromptTemplate,
    compactor: Option<Compactor>,
}

impl Refine {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            text_qa_template: text_qa_prompt(),
            refine_template: refine_prompt(),
            compactor: None,
        }
    }

    /// Compact-and-refine with the default byte budget
    pub fn compact(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm).with_compactor(Compactor::default())
    }

    pub fn with_compactor(mut self, compactor: Compactor) -> Self {
        self.compactor = Some(compactor);
        self
    }

    pub fn with_text_qa_template(mut self, template: PromptTemplate) -> Self {
        self.text_qa_template = template;
        self
    }

    pub fn with_refine_template(mut self, template: PromptTemplate) -> Self {
        self.refine_template = template;
        self
    }

    fn prepare(&self, query_str: &str, text_chunks: &[String]) -> Vec<String> {
        match &self.compactor {
            // Sized against the larger of the two prompts
            Some(compactor) => {
                let template = if compactor.available(&self.refine_template, query_str)
                    < compactor.available(&self.text_qa_template, query_str)
                {
                    &self.refine_template
                } else {
                    &self.text_qa_template
                };
                compactor.compact(template, query_str, text_chunks)
            }
            None => text_chunks
                .iter()
                .filter(|c| !c.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    fn step_prompt(
        &self,
        query_str: &str,
        chunk: &str,
        existing: Option<&str>,
    ) -> Result<String, DomainError> {
        match existing {
            None => render(
                &self.text_qa_template,
                &[("context_str", chunk), ("query_str", query_str)],
            ),
            Some(answer) => render(
                &self.refine_template,
                &[
                    ("query_str", query_str),
                    ("existing_answer", answer),
                    ("context_msg", chunk),
                ],
            ),
        }
    }

    /// Runs every step except the last and returns the prompt for the last one
    async fn run_until_last(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        chunks: &[String],
    ) -> Result<Option<String>, DomainError> {
        let Some((last, leading)) = chunks.split_last() else {
            return Ok(None);
        };

        let mut answer: Option<String> = None;
        for chunk in leading {
            let prompt = self.step_prompt(query_str, chunk, answer.as_deref())?;
            answer = Some(predict(self.llm.as_ref(), ctx, self.mode().as_str(), &prompt).await?);
        }

        debug!(steps = chunks.len(), "Refine pass prepared");
        self.step_prompt(query_str, last, answer.as_deref()).map(Some)
    }
}

#[async_trait]
impl ResponseSynthesizer for Refine {
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        let chunks = self.prepare(query_str, text_chunks);
        match self.run_until_last(ctx, query_str, &chunks).await? {
            Some(prompt) => predict(self.llm.as_ref(), ctx, self.mode().as_str(), &prompt).await,
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

        let chunks = self.prepare(query_str, text_chunks);
        match self.run_until_last(ctx, query_str, &chunks).await? {
            Some(prompt) => {
                stream_predict(self.llm.as_ref(), ctx, self.mode().as_str(), &prompt).await
            }
            None => Ok(Box::pin(futures::stream::iter(vec![Ok(EMPTY_RESPONSE.to_string())]))),
        }
    }

    fn mode(&self) -> ResponseMode {
        if self.compactor.is_some() {
            ResponseMode::Compact
        } else {
            ResponseMode::Refine
        }
    }
}

impl PromptMixin for Refine {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([
            (TEXT_QA_PROMPT_KEY.to_string(), self.text_qa_template.clone()),
            (REFINE_PROMPT_KEY.to_string(), self.refine_template.clone()),
        ])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        let text_qa = take_prompt(&mut prompts, TEXT_QA_PROMPT_KEY, TEXT_QA_VARS)?;
        let refine = take_prompt(&mut prompts, REFINE_PROMPT_KEY, REFINE_VARS)?;

        if let Some(template) = text_qa {
            self.text_qa_template = template;
        }
        if let Some(template) = refine {
            self.refine_template = template;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;

    fn chunks() -> Vec<String> {
        vec!["first".to_string(), "second".to_string(), "third".to_string()]
    }

    #[tokio::test]
    async fn test_one_call_per_chunk_in_order() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_replies(["v1", "v2", "v3"]));
        let synthesizer = Refine::new(llm.clone())
            .with_text_qa_template(PromptTemplate::new("QA {context_str} | {query_str}"))
            .with_refine_template(PromptTemplate::new(
                "REFINE {existing_answer} + {context_msg} | {query_str}",
            ));

        let answer = synthesizer
            .get_response(&QueryContext::background(), "q", &chunks())
            .await
            .unwrap();

        assert_eq!(answer, "v3");
        assert_eq!(
            llm.prompts(),
            vec![
                "QA first | q".to_string(),
                "REFINE v1 + second | q".to_string(),
                "REFINE v2 + third | q".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_compact_mode_packs_chunks() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("packed"));
        let synthesizer = Refine::compact(llm.clone());

        let answer = synthesizer
            .get_response(&QueryContext::background(), "q", &chunks())
            .await
            .unwrap();

        assert_eq!(answer, "packed");
        assert_eq!(llm.call_count(), 1);
        assert!(llm.prompts()[0].contains("first\n\nsecond\n\nthird"));
        assert_eq!(synthesizer.mode(), ResponseMode::Compact);
    }

    #[tokio::test]
    async fn test_error_mid_refine_propagates() {
        let llm = Arc::new(
            MockLlmProvider::new("mock")
                .with_reply("v1")
                .with_error("refine failed"),
        );
        let synthesizer = Refine::new(llm.clone());

        let err = synthesizer
            .get_response(&QueryContext::background(), "q", &chunks())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Upstream { .. }));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_call() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));
        let synthesizer = Refine::new(llm.clone());
        let (ctx, handle) = QueryContext::with_cancel();
        handle.cancel();

        let err = synthesizer.get_response(&ctx, "q", &chunks()).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_update_prompts_rejects_unknown_variable() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        let mut synthesizer = Refine::new(llm);

        let prompts = PromptDictionary::from([(
            REFINE_PROMPT_KEY.to_string(),
            PromptTemplate::new("{existing_answer} {bogus}"),
        )]);

        assert!(synthesizer.update_prompts(prompts).is_err());
        assert_eq!(synthesizer.get_prompts().len(), 2);
    }
}
