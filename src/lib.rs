//! PMP RAG
//!
//! Composable retrieval-augmented generation over pluggable LLMs:
//! - Text splitters (sentence, token, markdown, sentence window)
//! - Retrievers (vector, BM25 keyword, hybrid, knowledge graph, router, ...)
//! - Response synthesizers for every `ResponseMode`
//! - Query engines (retriever, router, sub-question, transform, retry)
//! - A ReAct-style tool-using agent
//!
//! Every blocking operation takes a [`QueryContext`] carrying cancellation and
//! an optional deadline.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::RagConfig;
pub use domain::{
    CancelHandle, DomainError, Message, MetadataFilter, Node, PromptTemplate, QueryBundle,
    QueryContext, Response, ResponseMode, ScoredNode, StreamingResponse, EMPTY_RESPONSE,
};

pub use domain::agent::ChatAgent;
pub use domain::embedding::EmbeddingProvider;
pub use domain::llm::LlmProvider;
pub use domain::query_engine::QueryEngine;
pub use domain::question_gen::QuestionGenerator;
pub use domain::retriever::Retriever;
pub use domain::selector::Selector;
pub use domain::splitter::TextSplitter;
pub use domain::store::{GraphStore, VectorStore};
pub use domain::synthesizer::ResponseSynthesizer;
pub use domain::tool::Tool;
pub use domain::transform::QueryTransform;

pub use infrastructure::agent::ReActAgent;
pub use infrastructure::ingestion::IngestionPipeline;
pub use infrastructure::query_engine::{
    RetrieverQueryEngine, RetryQueryEngine, RouterQueryEngine, SubQuestionQueryEngine,
    TransformQueryEngine,
};
pub use infrastructure::synthesizer::{get_response_synthesizer, SynthesizerBuilder};
