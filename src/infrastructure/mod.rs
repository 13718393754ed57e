//! Infrastructure layer - Concrete retrievers, synthesizers, engines and agents

pub mod agent;
pub mod ingestion;
pub mod logging;
pub mod observability;
pub mod predict;
pub mod query_engine;
pub mod question_gen;
pub mod retriever;
pub mod selector;
pub mod splitter;
pub mod store;
pub mod synthesizer;
pub mod tool;
pub mod transform;
