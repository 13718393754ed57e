use serde::{Deserialize, Serialize};

use super::MetadataFilter;

/// An immutable query: text, optional precomputed embedding and filters.
/// Transformations produce a new bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBundle {
    query_str: String,
    /// Strings to embed in place of `query_str`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    embedding_strs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filters: Option<MetadataFilter>,
}

impl QueryBundle {
    pub fn new(query_str: impl Into<String>) -> Self {
        Self {
            query_str: query_str.into(),
            embedding_strs: Vec::new(),
            embedding: None,
            filters: None,
        }
    }

    pub fn with_embedding_strs(mut self, strs: Vec<String>) -> Self {
        self.embedding_strs = strs;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_filters(mut self, filters: MetadataFilter) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Same metadata, different text
    pub fn with_query_str(&self, query_str: impl Into<String>) -> Self {
        Self {
            query_str: query_str.into(),
            ..self.clone()
        }
    }

    pub fn query_str(&self) -> &str {
        &self.query_str
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn filters(&self) -> Option<&MetadataFilter> {
        self.filters.as_ref()
    }

    /// Texts a retriever should embed; falls back to the query string
    pub fn embedding_strs(&self) -> Vec<&str> {
        if self.embedding_strs.is_empty() {
            vec![self.query_str.as_str()]
        } else {
            self.embedding_strs.iter().map(String::as_str).collect()
        }
    }
}

impl From<&str> for QueryBundle {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for QueryBundle {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

impl std::fmt::Display for QueryBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.query_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::FilterCondition;

    #[test]
    fn test_embedding_strs_default_to_query() {
        let query = QueryBundle::new("what is rust?");
        assert_eq!(query.embedding_strs(), vec!["what is rust?"]);

        let hyde = query.clone().with_embedding_strs(vec!["Rust is a language".to_string()]);
        assert_eq!(hyde.embedding_strs(), vec!["Rust is a language"]);
        assert_eq!(hyde.query_str(), "what is rust?");
    }

    #[test]
    fn test_with_query_str_keeps_filters() {
        let filter = MetadataFilter::condition(FilterCondition::eq("lang", "en"));
        let query = QueryBundle::from("original").with_filters(filter.clone());

        let rewritten = query.with_query_str("rewritten");

        assert_eq!(rewritten.query_str(), "rewritten");
        assert_eq!(rewritten.filters(), Some(&filter));
        assert_eq!(query.query_str(), "original");
    }
}
