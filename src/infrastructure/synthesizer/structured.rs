//! Tree summarization whose final answer is parsed into a typed record

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::prompts::SUMMARY_PROMPT_KEY;
use super::tree::TreeSummarize;
use crate::domain::llm::{LlmJsonSchema, LlmProvider, LlmResponseFormat};
use crate::domain::prompt::{PromptDictionary, PromptMixin};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::{
    DomainError, PromptTemplate, QueryBundle, QueryContext, Response, ResponseMode, ScoredNode,
};

pub const PARSE_FAILED_METADATA_KEY: &str = "parse_failed";
pub const STRUCTURED_METADATA_KEY: &str = "structured";

const SCHEMA_INSTRUCTIONS: &str = "\nRespond only with a JSON value matching this JSON schema:\n{schema}\n";

/// Parses the tree-summarized answer as `T`. A parse failure is not an error:
/// the raw text is kept and `parse_failed` is set in the response metadata.
/// LLMs with a native JSON mode also receive the schema as the response format.
pub struct StructuredSynthesizer<T> {
    tree: TreeSummarize,
    schema: String,
    format: LlmResponseFormat,
    _output: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for StructuredSynthesizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredSynthesizer")
            .field("tree", &self.tree)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> StructuredSynthesizer<T> {
    fn prepare(&self, tree: TreeSummarize) -> TreeSummarize {
        let template = self.with_schema(tree.summary_template());
        tree.with_summary_template(template)
            .with_output_format(self.format.clone())
    }

    /// Appends the schema instructions unless the template already carries them
    fn with_schema(&self, template: &PromptTemplate) -> PromptTemplate {
        if template.variables().iter().any(|v| v == "schema") {
            return template.clone();
        }
        template
            .append(SCHEMA_INSTRUCTIONS)
            .partial_format(&[("schema", self.schema.as_str())])
    }
}

impl<T> StructuredSynthesizer<T>
where
    T: JsonSchema + DeserializeOwned + Serialize,
{
    pub fn new(llm: Arc<dyn LlmProvider>) -> Result<Self, DomainError> {
        let schema_value = serde_json::to_value(schemars::schema_for!(T))
            .map_err(|e| DomainError::internal(format!("schema serialization: {}", e)))?;
        let schema = schema_value.to_string();
        let format = LlmResponseFormat::JsonSchema {
            json_schema: LlmJsonSchema {
                name: T::schema_name().into_owned(),
                schema: schema_value,
                strict: false,
            },
        };

        let synthesizer = Self {
            tree: TreeSummarize::new(llm.clone()),
            schema,
            format,
            _output: PhantomData,
        };
        Ok(synthesizer.with_tree(TreeSummarize::new(llm)))
    }

    /// Replaces the inner tree summarizer, e.g. to change its compaction budget.
    /// The schema instructions are appended to its summary template.
    pub fn with_tree(mut self, tree: TreeSummarize) -> Self {
        self.tree = self.prepare(tree);
        self
    }

    /// Synthesizes and returns the parsed record alongside the response
    pub async fn synthesize_structured(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
        nodes: Vec<ScoredNode>,
    ) -> Result<(Response, Option<T>), DomainError> {
        ctx.check()?;
        if nodes.is_empty() {
            return Ok((Response::empty(), None));
        }

        let chunks: Vec<String> = nodes.iter().map(|n| n.content().to_string()).collect();
        let raw = self.tree.get_response(ctx, query.query_str(), &chunks).await?;

        match parse_structured::<T>(&raw) {
            Ok(value) => {
                let json = serde_json::to_value(&value)
                    .map_err(|e| DomainError::internal(format!("structured output: {}", e)))?;
                let response = Response::new(json.to_string(), nodes)
                    .with_metadata(PARSE_FAILED_METADATA_KEY, false)
                    .with_metadata(STRUCTURED_METADATA_KEY, json);
                Ok((response, Some(value)))
            }
            Err(err) => {
                warn!(error = %err, "Structured output did not parse; keeping raw text");
                let response =
                    Response::new(raw, nodes).with_metadata(PARSE_FAILED_METADATA_KEY, true);
                Ok((response, None))
            }
        }
    }
}

/// Parses `raw` as `T`, tolerating code fences and prose around the JSON
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, DomainError> {
    let candidate = extract_json(raw)
        .ok_or_else(|| DomainError::parse_failed("no JSON value in output"))?;
    serde_json::from_str(candidate).map_err(|e| DomainError::parse_failed(e.to_string()))
}

/// The outermost JSON object or array in `text`
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;

    (end > start).then(|| &text[start..=end])
}

#[async_trait]
impl<T> ResponseSynthesizer for StructuredSynthesizer<T>
where
    T: JsonSchema + DeserializeOwned + Serialize + Send + Sync,
{
    async fn get_response(
        &self,
        ctx: &QueryContext,
        query_str: &str,
        text_chunks: &[String],
    ) -> Result<String, DomainError> {
        self.tree.get_response(ctx, query_str, text_chunks).await
    }

    async fn synthesize(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
        nodes: Vec<ScoredNode>,
    ) -> Result<Response, DomainError> {
        let (response, _) = self.synthesize_structured(ctx, query, nodes).await?;
        Ok(response)
    }

    fn mode(&self) -> ResponseMode {
        ResponseMode::TreeSummarize
    }
}

impl<T> PromptMixin for StructuredSynthesizer<T> {
    fn get_prompts(&self) -> PromptDictionary {
        self.tree.get_prompts()
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = prompts.remove(SUMMARY_PROMPT_KEY) {
            prompts.insert(SUMMARY_PROMPT_KEY.to_string(), self.with_schema(&template));
        }
        self.tree.update_prompts(prompts)
    }
}
