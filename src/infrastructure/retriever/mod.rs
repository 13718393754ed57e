//! Retriever implementations

mod composable;
mod hybrid;
mod keyword;
mod knowledge_graph;
mod metadata_filter;
mod router;
mod time_weighted;
mod vector;

pub use composable::ComposableRetriever;
pub use hybrid::HybridRetriever;
pub use keyword::{KeywordRetriever, DEFAULT_BM25_B, DEFAULT_BM25_K1};
pub use knowledge_graph::{KnowledgeGraphRetriever, DEFAULT_KG_DEPTH, DEFAULT_MAX_KEYWORDS};
pub use metadata_filter::MetadataFilterRetriever;
pub use router::{RouterRetriever, RETRIEVER_METADATA_KEY};
pub use time_weighted::{Clock, TimeWeightedRetriever, DEFAULT_DECAY_RATE, LAST_ACCESSED_METADATA_KEY};
pub use vector::{VectorIndexRetriever, DEFAULT_SIMILARITY_TOP_K};

pub(crate) use router::checked_indices;
