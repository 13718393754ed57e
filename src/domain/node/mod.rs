//! Nodes, scored nodes, queries and metadata filters

mod entity;
mod filter;
mod query;
mod triplet;

pub use entity::{dedup_by_id, sort_scored_nodes, Metadata, Node, NodeKind, ScoredNode};
pub use filter::{FilterBuilder, FilterCondition, FilterConnector, FilterOperator, MetadataFilter};
pub use query::QueryBundle;
pub use triplet::Triplet;
