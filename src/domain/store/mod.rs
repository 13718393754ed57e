//! Storage abstractions for vectors and knowledge-graph triplets

mod graph_store;
mod vector_store;

pub use graph_store::GraphStore;
pub use vector_store::{ScoredId, VectorStore, VectorStoreQuery};
