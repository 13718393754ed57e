//! In-memory store implementations

mod in_memory_graph;
mod in_memory_vector;

pub use in_memory_graph::InMemoryGraphStore;
pub use in_memory_vector::InMemoryVectorStore;
