//! Decomposes a query into sub-questions answered by specialised engines

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::node::dedup_by_id;
use crate::domain::query_engine::QueryEngine;
use crate::domain::question_gen::{QuestionGenerator, SubQuestion};
use crate::domain::synthesizer::ResponseSynthesizer;
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryBundle, QueryContext, Response, ScoredNode};
use crate::infrastructure::observability::{record_query, record_subquestion_dropped};

const ENGINE_NAME: &str = "sub_question";

/// Metadata key holding the answered `(sub_question, tool_name, answer)` triples
pub const SUB_QA_METADATA_KEY: &str = "sub_qa";

/// Metadata key counting sub-questions that were dropped
pub const FAILED_SUB_QUESTIONS_METADATA_KEY: &str = "failed_sub_questions";

/// One answered sub-question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubQuestionAnswer {
    pub sub_question: String,
    pub tool_name: String,
    pub answer: String,
    #[serde(skip)]
    pub sources: Vec<ScoredNode>,
}

impl SubQuestionAnswer {
    fn as_chunk(&self) -> String {
        format!("Sub question: {}\nResponse: {}", self.sub_question, self.answer)
    }
}

/// Answers each generated sub-question with the named engine, then synthesizes
/// the final answer from the sub-answers. Failed sub-questions are dropped.
#[derive(Debug, Clone)]
pub struct SubQuestionQueryEngine {
    tools: Vec<ToolMetadata>,
    engines: HashMap<String, Arc<dyn QueryEngine>>,
    question_gen: Arc<dyn QuestionGenerator>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
    use_async: bool,
}

impl SubQuestionQueryEngine {
    pub fn new(
        engines: Vec<(Arc<dyn QueryEngine>, ToolMetadata)>,
        question_gen: Arc<dyn QuestionGenerator>,
        synthesizer: Arc<dyn ResponseSynthesizer>,
    ) -> Result<Self, DomainError> {
        if engines.is_empty() {
            return Err(DomainError::bad_input("sub-question engine needs at least one query engine"));
        }

        let mut tools = Vec::with_capacity(engines.len());
        let mut by_name = HashMap::with_capacity(engines.len());
        for (engine, meta) in engines {
            if by_name.insert(meta.name.clone(), engine).is_some() {
                return Err(DomainError::invalid_config(format!(
                    "duplicate tool name '{}'",
                    meta.name
                )));
            }
            tools.push(meta);
        }

        Ok(Self {
            tools,
            engines: by_name,
            question_gen,
            synthesizer,
            use_async: false,
        })
    }

    /// Answer sub-questions concurrently; answers keep generator order
    pub fn with_use_async(mut self, use_async: bool) -> Self {
        self.use_async = use_async;
        self
    }

    async fn answer_one(
        &self,
        ctx: &QueryContext,
        question: &SubQuestion,
    ) -> Result<Option<SubQuestionAnswer>, DomainError> {
        let Some(engine) = self.engines.get(&question.tool_name) else {
            warn!(tool = %question.tool_name, "Skipping sub-question for unknown tool");
            record_subquestion_dropped("unknown_tool");
            return Ok(None);
        };

        debug!(tool = %question.tool_name, sub_question = %question.sub_question, "Answering sub-question");

        match engine.query(ctx, &QueryBundle::new(question.sub_question.clone())).await {
            Ok(response) => Ok(Some(SubQuestionAnswer {
                sub_question: question.sub_question.clone(),
                tool_name: question.tool_name.clone(),
                answer: response.response,
                sources: response.source_nodes,
            })),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                warn!(tool = %question.tool_name, error = %err, "Dropping failed sub-question");
                record_subquestion_dropped("error");
                Ok(None)
            }
        }
    }

    async fn answer_all(
        &self,
        ctx: &QueryContext,
        questions: &[SubQuestion],
    ) -> Result<Vec<Option<SubQuestionAnswer>>, DomainError> {
        if self.use_async {
            return try_join_all(questions.iter().map(|q| self.answer_one(ctx, q))).await;
        }

        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            ctx.check()?;
            answers.push(self.answer_one(ctx, question).await?);
        }
        Ok(answers)
    }

    async fn decompose(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let questions = ctx
            .run(self.question_gen.generate(ctx, &self.tools, query))
            .await?;
        info!(count = questions.len(), "Generated sub-questions");

        let outcomes = self.answer_all(ctx, &questions).await?;
        let failed = outcomes.iter().filter(|o| o.is_none()).count();
        let answers: Vec<SubQuestionAnswer> = outcomes.into_iter().flatten().collect();

        let chunks: Vec<String> = answers.iter().map(SubQuestionAnswer::as_chunk).collect();
        let sources = dedup_by_id(answers.iter().flat_map(|a| a.sources.iter().cloned()).collect());

        let response = if chunks.is_empty() {
            Response::new("", sources)
        } else {
            let text = self
                .synthesizer
                .get_response(ctx, query.query_str(), &chunks)
                .await?;
            Response::new(text, sources)
        };

        Ok(response
            .with_metadata(SUB_QA_METADATA_KEY, json!(answers))
            .with_metadata(FAILED_SUB_QUESTIONS_METADATA_KEY, failed))
    }
}

#[async_trait]
impl QueryEngine for SubQuestionQueryEngine {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let started = Instant::now();
        let result = self.decompose(ctx, query).await;
        record_query(ENGINE_NAME, started.elapsed(), result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::query_engine::MockQueryEngine;
    use crate::domain::question_gen::StaticQuestionGenerator;
    use crate::domain::{Node, EMPTY_RESPONSE};
    use crate::infrastructure::synthesizer::SimpleSummarize;

    fn node(id: &str) -> ScoredNode {
        ScoredNode::new(Node::with_id(id, id.to_uppercase()), 0.5)
    }

    fn engine_tools(
        first: Arc<MockQueryEngine>,
        second: Arc<MockQueryEngine>,
    ) -> Vec<(Arc<dyn QueryEngine>, ToolMetadata)> {
        vec![
            (first, ToolMetadata::new("engine1", "First corpus")),
            (second, ToolMetadata::new("engine2", "Second corpus")),
        ]
    }

    fn questions(pairs: &[(&str, &str)]) -> Arc<StaticQuestionGenerator> {
        Arc::new(StaticQuestionGenerator::new(
            pairs.iter().map(|(tool, q)| SubQuestion::new(*tool, *q)).collect(),
        ))
    }

    #[tokio::test]
    async fn test_combines_sub_answers() {
        let first = Arc::new(MockQueryEngine::answering("A1", vec![node("a"), node("shared")]));
        let second = Arc::new(MockQueryEngine::answering("A2", vec![node("b"), node("shared")]));
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("Combined answer"));

        let engine = SubQuestionQueryEngine::new(
            engine_tools(first.clone(), second.clone()),
            questions(&[("engine1", "q1"), ("engine2", "q2")]),
            Arc::new(SimpleSummarize::new(llm.clone())),
        )
        .unwrap();

        let response = engine
            .query_text(&QueryContext::background(), "compare both")
            .await
            .unwrap();

        assert_eq!(response.text(), "Combined answer");
        let ids: Vec<&str> = response.source_nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["a", "shared", "b"]);
        assert_eq!(first.queries(), vec!["q1".to_string()]);
        assert_eq!(second.queries(), vec!["q2".to_string()]);

        let prompts = llm.prompts();
        assert!(prompts[0].contains("Sub question: q1\nResponse: A1\n\nSub question: q2\nResponse: A2"));
        assert!(prompts[0].contains("compare both"));

        assert_eq!(response.metadata[FAILED_SUB_QUESTIONS_METADATA_KEY], json!(0));
        assert_eq!(
            response.metadata[SUB_QA_METADATA_KEY],
            json!([
                {"sub_question": "q1", "tool_name": "engine1", "answer": "A1"},
                {"sub_question": "q2", "tool_name": "engine2", "answer": "A2"}
            ])
        );
    }

    #[tokio::test]
    async fn test_failed_and_unknown_sub_questions_dropped() {
        let first = Arc::new(MockQueryEngine::answering("A1", vec![node("a")]));
        let second = Arc::new(MockQueryEngine::failing(DomainError::upstream("engine", "down")));
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("Partial answer"));

        let engine = SubQuestionQueryEngine::new(
            engine_tools(first, second),
            questions(&[("engine1", "q1"), ("engine2", "q2"), ("missing", "q3")]),
            Arc::new(SimpleSummarize::new(llm.clone())),
        )
        .unwrap()
        .with_use_async(true);

        let response = engine.query_text(&QueryContext::background(), "q").await.unwrap();

        assert_eq!(response.text(), "Partial answer");
        assert_eq!(response.source_nodes.len(), 1);
        assert_eq!(response.metadata[FAILED_SUB_QUESTIONS_METADATA_KEY], json!(2));
        let prompts = llm.prompts();
        assert!(!prompts[0].contains("q2"));
    }

    #[tokio::test]
    async fn test_all_dropped_gives_empty_response() {
        let first = Arc::new(MockQueryEngine::failing(DomainError::upstream("engine", "down")));
        let second = Arc::new(MockQueryEngine::answering("unused", Vec::new()));
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));

        let engine = SubQuestionQueryEngine::new(
            engine_tools(first, second),
            questions(&[("engine1", "q1")]),
            Arc::new(SimpleSummarize::new(llm.clone())),
        )
        .unwrap();

        let response = engine.query_text(&QueryContext::background(), "q").await.unwrap();
        assert_eq!(response.text(), EMPTY_RESPONSE);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_propagates() {
        let first = Arc::new(MockQueryEngine::failing(DomainError::cancelled("stop")));
        let second = Arc::new(MockQueryEngine::answering("A2", Vec::new()));
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("unused"));

        let engine = SubQuestionQueryEngine::new(
            engine_tools(first, second.clone()),
            questions(&[("engine1", "q1"), ("engine2", "q2")]),
            Arc::new(SimpleSummarize::new(llm)),
        )
        .unwrap();

        let err = engine.query_text(&QueryContext::background(), "q").await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(second.call_count(), 0);
    }

    #[test]
    fn test_construction_errors() {
        let llm = Arc::new(MockLlmProvider::new("mock"));
        let synthesizer = Arc::new(SimpleSummarize::new(llm));

        let err = SubQuestionQueryEngine::new(Vec::new(), questions(&[]), synthesizer.clone()).unwrap_err();
        assert!(matches!(err, DomainError::BadInput { .. }));

        let engine = Arc::new(MockQueryEngine::new());
        let duplicate: Vec<(Arc<dyn QueryEngine>, ToolMetadata)> = vec![
            (engine.clone(), ToolMetadata::new("same", "one")),
            (engine, ToolMetadata::new("same", "two")),
        ];
        let err = SubQuestionQueryEngine::new(duplicate, questions(&[]), synthesizer).unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig { .. }));
    }
}
