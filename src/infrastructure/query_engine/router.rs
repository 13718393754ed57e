//! Routes a query to the engines a selector picks

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::json;
use tracing::info;

use crate::domain::node::dedup_by_id;
use crate::domain::query_engine::QueryEngine;
use crate::domain::selector::Selector;
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryBundle, QueryContext, Response};
use crate::infrastructure::observability::record_query;
use crate::infrastructure::retriever::checked_indices;

const ENGINE_NAME: &str = "router";

/// Metadata key listing the engines that answered
pub const SELECTED_ENGINES_METADATA_KEY: &str = "selected_engines";

/// Delegates to one or more engines chosen by a selector.
///
/// A single selection returns the chosen engine's response unchanged. Several
/// selections are either re-synthesized by the summarizer or joined with blank
/// lines; either way the sources of every called engine are kept.
#[derive(Debug, Clone)]
pub struct RouterQueryEngine {
    engines: Vec<(Arc<dyn QueryEngine>, ToolMetadata)>,
    choices: Vec<ToolMetadata>,
    selector: Arc<dyn Selector>,
    summarizer: Option<Arc<dyn ResponseSynthesizer>>,
}

impl RouterQueryEngine {
    pub fn new(
        engines: Vec<(Arc<dyn QueryEngine>, ToolMetadata)>,
        selector: Arc<dyn Selector>,
    ) -> Result<Self, DomainError> {
        if engines.is_empty() {
            return Err(DomainError::bad_input("router needs at least one query engine"));
        }

        let choices = engines.iter().map(|(_, meta)| meta.clone()).collect();
        Ok(Self {
            engines,
            choices,
            selector,
            summarizer: None,
        })
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn ResponseSynthesizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    async fn route(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let selection = ctx.run(self.selector.select(ctx, &self.choices, query)).await?;
        let indices = checked_indices(selection.indices(), self.engines.len())?;
        let names: Vec<&str> = indices.iter().map(|i| self.choices[*i].name.as_str()).collect();

        info!(selected = ?names, reasons = ?selection.reasons(), "Routing query");

        if let [index] = indices.as_slice() {
            let (engine, _) = &self.engines[*index];
            return engine.query(ctx, query).await;
        }

        let responses = try_join_all(
            indices
                .iter()
                .map(|i| async move { self.engines[*i].0.query(ctx, query).await }),
        )
        .await?;

        let sources = dedup_by_id(
            responses
                .iter()
                .flat_map(|r| r.source_nodes.iter().cloned())
                .collect(),
        );
        let texts: Vec<String> = responses.iter().map(|r| r.response.clone()).collect();

        let text = match &self.summarizer {
            Some(summarizer) => summarizer.get_response(ctx, query.query_str(), &texts).await?,
            None => texts.join("\n\n"),
        };

        Ok(Response::new(text, sources).with_metadata(SELECTED_ENGINES_METADATA_KEY, json!(names)))
    }
}

#[async_trait]
impl QueryEngine for RouterQueryEngine {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let started = Instant::now();
        let result = self.route(ctx, query).await;
        record_query(ENGINE_NAME, started.elapsed(), result.is_ok());
        result
    }
}
