//! Nodes: the unit of retrieval

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::DomainError;

/// Node metadata: string keys to JSON values
pub type Metadata = HashMap<String, Value>;

/// What a node stands for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Text,
    Document,
    /// Points at another retriever through the `index_id` metadata key
    Index,
}

/// A chunk of content with metadata and an optional embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,
    content: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    kind: NodeKind,
}

impl Node {
    /// Create a text node with a fresh UUID
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), content)
    }

    pub fn with_id(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: None,
            kind: NodeKind::Text,
        }
    }

    /// An index node routing to the retriever registered under `index_id`
    pub fn index(index_id: impl Into<String>, summary: impl Into<String>) -> Self {
        let index_id = index_id.into();
        Self::with_id(index_id.clone(), summary)
            .with_kind(NodeKind::Index)
            .with_metadata("index_id", index_id)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_all_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Populates the embedding. A node is embedded at most once.
    pub fn set_embedding(&mut self, embedding: Vec<f32>) -> Result<(), DomainError> {
        if self.embedding.is_some() {
            return Err(DomainError::internal(format!(
                "node '{}' already has an embedding",
                self.id
            )));
        }
        self.embedding = Some(embedding);
        Ok(())
    }

    /// Metadata rendered as `key: value` lines, sorted by key
    pub fn metadata_text(&self) -> String {
        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();

        keys.into_iter()
            .map(|key| match &self.metadata[key] {
                Value::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A node with a relevance score; higher is better
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}

impl ScoredNode {
    pub fn new(node: Node, score: f32) -> Self {
        Self { node, score }
    }

    pub fn id(&self) -> &str {
        self.node.id()
    }

    pub fn content(&self) -> &str {
        self.node.content()
    }
}

/// Stable sort by descending score; NaN scores compare equal
pub fn sort_scored_nodes(nodes: &mut [ScoredNode]) {
    nodes.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Keeps the first occurrence of every node id, preserving order
pub fn dedup_by_id(nodes: Vec<ScoredNode>) -> Vec<ScoredNode> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|n| seen.insert(n.id().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, score: f32) -> ScoredNode {
        ScoredNode::new(Node::with_id(id, id), score)
    }

    #[test]
    fn test_new_node_has_uuid() {
        let a = Node::new("alpha");
        let b = Node::new("alpha");

        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
        assert_eq!(a.kind(), NodeKind::Text);
    }

    #[test]
    fn test_set_embedding_once() {
        let mut node = Node::new("text");

        assert!(node.set_embedding(vec![0.1, 0.2]).is_ok());
        assert!(node.set_embedding(vec![0.3]).is_err());
        assert_eq!(node.embedding(), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn test_index_node() {
        let node = Node::index("docs", "All product docs");

        assert_eq!(node.kind(), NodeKind::Index);
        assert_eq!(node.metadata_str("index_id"), Some("docs"));
    }

    #[test]
    fn test_metadata_text_sorted() {
        let node = Node::new("x")
            .with_metadata("source", "a.md")
            .with_metadata("page", 3);

        assert_eq!(node.metadata_text(), "page: 3\nsource: a.md");
    }

    #[test]
    fn test_sort_is_stable_descending() {
        let mut nodes = vec![scored("a", 0.5), scored("b", 0.9), scored("c", 0.5), scored("d", 0.1)];

        sort_scored_nodes(&mut nodes);

        let ids: Vec<&str> = nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let nodes = vec![scored("a", 0.9), scored("b", 0.8), scored("a", 0.1)];

        let deduped = dedup_by_id(nodes);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].score, 0.9);
    }
}
