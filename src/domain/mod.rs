//! Domain layer - Core types and contracts

pub mod agent;
pub mod context;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod node;
pub mod prompt;
pub mod query_engine;
pub mod question_gen;
pub mod retriever;
pub mod selector;
pub mod splitter;
pub mod store;
pub mod synthesizer;
pub mod tool;
pub mod transform;

pub use context::{CancelHandle, QueryContext};
pub use error::DomainError;
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, LlmStream, Message,
    MessageRole, StreamChunk, TextStream, Usage,
};
pub use node::{MetadataFilter, Node, NodeKind, QueryBundle, ScoredNode};
pub use prompt::{PromptMixin, PromptTemplate};
pub use synthesizer::{Response, ResponseMode, StreamingResponse, EMPTY_RESPONSE};
