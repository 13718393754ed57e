//! Hypothetical document embeddings

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::llm::LlmProvider;
use crate::domain::prompt::defaults::hyde_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::transform::QueryTransform;
use crate::domain::{DomainError, PromptTemplate, QueryBundle, QueryContext};
use crate::infrastructure::predict::predict;

pub const HYDE_PROMPT_KEY: &str = "hyde_prompt";
const HYDE_VARS: &[&str] = &["query_str"];

/// Has the LLM write a passage answering the query and retrieves with that
/// passage. The query text itself is untouched; only the strings to embed change.
#[derive(Debug, Clone)]
pub struct HydeTransform {
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    include_original: bool,
}

impl HydeTransform {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            template: hyde_prompt(),
            include_original: true,
        }
    }

    /// Also embed the original query next to the hypothetical passage
    pub fn with_include_original(mut self, include_original: bool) -> Self {
        self.include_original = include_original;
        self
    }
}

#[async_trait]
impl QueryTransform for HydeTransform {
    async fn transform(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<QueryBundle, DomainError> {
        let prompt = self.template.format(&[("query_str", query.query_str())])?;
        let passage = predict(self.llm.as_ref(), ctx, "hyde", &prompt).await?;
        debug!(passage_len = passage.len(), "Generated hypothetical document");

        let mut embedding_strs = vec![passage];
        if self.include_original {
            embedding_strs.push(query.query_str().to_string());
        }

        let mut transformed = QueryBundle::new(query.query_str()).with_embedding_strs(embedding_strs);
        if let Some(filters) = query.filters() {
            transformed = transformed.with_filters(filters.clone());
        }
        Ok(transformed)
    }

    fn name(&self) -> &'static str {
        "hyde"
    }
}

impl PromptMixin for HydeTransform {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(HYDE_PROMPT_KEY.to_string(), self.template.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, HYDE_PROMPT_KEY, HYDE_VARS)? {
            self.template = template;
        }
        Ok(())
    }
}
