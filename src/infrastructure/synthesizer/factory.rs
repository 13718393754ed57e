//! Builds a synthesizer for a response mode

use std::sync::Arc;

use super::accumulate::{Accumulate, DEFAULT_ACCUMULATE_SEPARATOR};
use super::compact::{Compactor, DEFAULT_COMPACT_SIZE};
use super::degenerate::{ContextOnly, Generation, NoText};
use super::refine::Refine;
use super::simple::SimpleSummarize;
use super::tree::TreeSummarize;
use crate::config::SynthesizerSettings;
use crate::domain::llm::LlmProvider;
use crate::domain::prompt::{PromptDictionary, PromptMixin};
use crate::domain::splitter::Tokenizer;
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{DomainError, ResponseMode};
use crate::infrastructure::splitter::ByteLengthTokenizer;

/// Configures and builds any of the built-in synthesizers
#[derive(Debug, Clone)]
pub struct SynthesizerBuilder {
    llm: Arc<dyn LlmProvider>,
    mode: ResponseMode,
    tokenizer: Arc<dyn Tokenizer>,
    compact_size: usize,
    use_async: bool,
    accumulate_separator: String,
    prompts: PromptDictionary,
}

impl SynthesizerBuilder {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            mode: ResponseMode::default(),
            tokenizer: Arc::new(ByteLengthTokenizer),
            compact_size: DEFAULT_COMPACT_SIZE,
            use_async: false,
            accumulate_separator: DEFAULT_ACCUMULATE_SEPARATOR.to_string(),
            prompts: PromptDictionary::new(),
        }
    }

    pub fn from_settings(llm: Arc<dyn LlmProvider>, settings: &SynthesizerSettings) -> Self {
        Self::new(llm)
            .mode(settings.response_mode)
            .compact_size(settings.compact_size)
            .use_async(settings.use_async)
            .accumulate_separator(settings.accumulate_separator.clone())
    }

    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn compact_size(mut self, compact_size: usize) -> Self {
        self.compact_size = compact_size;
        self
    }

    pub fn use_async(mut self, use_async: bool) -> Self {
        self.use_async = use_async;
        self
    }

    pub fn accumulate_separator(mut self, separator: impl Into<String>) -> Self {
        self.accumulate_separator = separator.into();
        self
    }

    /// Prompt overrides by key (`text_qa_template`, `refine_template`, ...)
    pub fn prompts(mut self, prompts: PromptDictionary) -> Self {
        self.prompts.extend(prompts);
        self
    }

    fn compactor(&self) -> Compactor {
        Compactor::new(self.tokenizer.clone(), self.compact_size)
    }

    pub fn build(self) -> Result<Arc<dyn ResponseSynthesizer>, DomainError> {
        if self.compact_size == 0 {
            return Err(DomainError::invalid_config("compact_size must be greater than 0"));
        }

        let llm = self.llm.clone();
        let prompts = self.prompts.clone();

        let synthesizer: Arc<dyn ResponseSynthesizer> = match self.mode {
            ResponseMode::SimpleSummarize => Arc::new(with_prompts(SimpleSummarize::new(llm), prompts)?),
            ResponseMode::Refine => Arc::new(with_prompts(Refine::new(llm), prompts)?),
            ResponseMode::Compact => Arc::new(with_prompts(
                Refine::new(llm).with_compactor(self.compactor()),
                prompts,
            )?),
            ResponseMode::TreeSummarize => Arc::new(with_prompts(
                TreeSummarize::new(llm)
                    .with_compactor(self.compactor())
                    .with_use_async(self.use_async),
                prompts,
            )?),
            ResponseMode::Accumulate => Arc::new(with_prompts(
                Accumulate::new(llm)
                    .with_separator(self.accumulate_separator.clone())
                    .with_use_async(self.use_async),
                prompts,
            )?),
            ResponseMode::CompactAccumulate => Arc::new(with_prompts(
                Accumulate::new(llm)
                    .with_compactor(self.compactor())
                    .with_separator(self.accumulate_separator.clone())
                    .with_use_async(self.use_async),
                prompts,
            )?),
            ResponseMode::Generation => Arc::new(with_prompts(Generation::new(llm), prompts)?),
            ResponseMode::NoText => Arc::new(NoText),
            ResponseMode::ContextOnly => Arc::new(ContextOnly),
        };

        Ok(synthesizer)
    }
}

fn with_prompts<S: PromptMixin>(mut synthesizer: S, prompts: PromptDictionary) -> Result<S, DomainError> {
    if !prompts.is_empty() {
        synthesizer.update_prompts(prompts)?;
    }
    Ok(synthesizer)
}

/// Default synthesizer for `mode`
pub fn get_response_synthesizer(
    llm: Arc<dyn LlmProvider>,
    mode: ResponseMode,
) -> Result<Arc<dyn ResponseSynthesizer>, DomainError> {
    SynthesizerBuilder::new(llm).mode(mode).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::{PromptTemplate, QueryBundle, QueryContext, EMPTY_RESPONSE};

    #[tokio::test]
    async fn test_every_mode_builds_and_handles_empty_nodes() {
        let llm = Arc::new(MockLlmProvider::new("mock"));

        for mode in ResponseMode::all() {
            let synthesizer = get_response_synthesizer(llm.clone(), mode).unwrap();
            assert_eq!(synthesizer.mode(), mode);

            let response = synthesizer
                .synthesize(&QueryContext::background(), &QueryBundle::new("q"), Vec::new())
                .await
                .unwrap();
            assert_eq!(response.text(), EMPTY_RESPONSE);
        }
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_overrides_applied() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("ok"));
        let synthesizer = SynthesizerBuilder::new(llm.clone())
            .mode(ResponseMode::SimpleSummarize)
            .prompts(PromptDictionary::from([(
                "text_qa_template".to_string(),
                PromptTemplate::new("Q={query_str} C={context_str}"),
            )]))
            .build()
            .unwrap();

        synthesizer
            .get_response(&QueryContext::background(), "why", &["because".to_string()])
            .await
            .unwrap();

        assert_eq!(llm.prompts(), vec!["Q=why C=because".to_string()]);
    }

    #[test]
    fn test_settings_applied() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        let settings = SynthesizerSettings {
            response_mode: ResponseMode::TreeSummarize,
            ..SynthesizerSettings::default()
        };

        let synthesizer = SynthesizerBuilder::from_settings(llm, &settings).build().unwrap();
        assert_eq!(synthesizer.mode(), ResponseMode::TreeSummarize);
    }

    #[test]
    fn test_zero_compact_size_rejected() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        assert!(SynthesizerBuilder::new(llm).compact_size(0).build().is_err());
    }
}
