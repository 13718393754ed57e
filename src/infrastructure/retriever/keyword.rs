//! Okapi BM25 keyword retrieval over an in-memory corpus

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::node::sort_scored_nodes;
use crate::domain::retriever::Retriever;
use crate::domain::{DomainError, Node, QueryBundle, QueryContext, ScoredNode};
use crate::infrastructure::observability::record_retrieval;

pub const DEFAULT_BM25_K1: f32 = 1.2;
pub const DEFAULT_BM25_B: f32 = 0.75;

#[derive(Debug, Clone)]
struct IndexedNode {
    node: Node,
    term_freqs: HashMap<String, usize>,
    length: usize,
}

/// Ranks nodes by BM25 over lowercased unicode words.
/// The index is built once at construction.
#[derive(Debug, Clone)]
pub struct KeywordRetriever {
    docs: Vec<IndexedNode>,
    doc_freqs: HashMap<String, usize>,
    avg_length: f32,
    top_k: usize,
    k1: f32,
    b: f32,
}

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

impl KeywordRetriever {
    pub fn new(nodes: Vec<Node>, top_k: usize) -> Result<Self, DomainError> {
        Self::with_params(nodes, top_k, DEFAULT_BM25_K1, DEFAULT_BM25_B)
    }

    pub fn with_params(nodes: Vec<Node>, top_k: usize, k1: f32, b: f32) -> Result<Self, DomainError> {
        if top_k == 0 {
            return Err(DomainError::invalid_config("top_k must be greater than 0"));
        }
        if k1 < 0.0 || !(0.0..=1.0).contains(&b) {
            return Err(DomainError::invalid_config("bm25 requires k1 >= 0 and b in [0, 1]"));
        }

        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let docs: Vec<IndexedNode> = nodes
            .into_iter()
            .map(|node| {
                let tokens = tokenize(node.content());
                let mut term_freqs = HashMap::new();
                for token in &tokens {
                    *term_freqs.entry(token.clone()).or_insert(0) += 1;
                }
                for term in term_freqs.keys() {
                    *doc_freqs.entry(term.clone()).or_insert(0) += 1;
                }
                IndexedNode {
                    node,
                    term_freqs,
                    length: tokens.len(),
                }
            })
            .collect();

        let total: usize = docs.iter().map(|d| d.length).sum();
        let avg_length = if docs.is_empty() {
            0.0
        } else {
            total as f32 / docs.len() as f32
        };

        Ok(Self {
            docs,
            doc_freqs,
            avg_length,
            top_k,
            k1,
            b,
        })
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, doc: &IndexedNode, terms: &[String]) -> f32 {
        let length_norm = if self.avg_length > 0.0 {
            doc.length as f32 / self.avg_length
        } else {
            0.0
        };

        terms
            .iter()
            .filter_map(|term| doc.term_freqs.get(term).map(|tf| (term, *tf as f32)))
            .map(|(term, tf)| {
                let denom = tf + self.k1 * (1.0 - self.b + self.b * length_norm);
                self.idf(term) * tf * (self.k1 + 1.0) / denom
            })
            .sum()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        ctx.check()?;
        let started = Instant::now();

        let mut terms = tokenize(query.query_str());
        terms.sort();
        terms.dedup();

        let mut nodes: Vec<ScoredNode> = self
            .docs
            .iter()
            .filter(|doc| {
                query
                    .filters()
                    .is_none_or(|filter| filter.matches(doc.node.metadata()))
            })
            .map(|doc| (doc, self.score(doc, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc, score)| ScoredNode::new(doc.node.clone(), score))
            .collect();

        sort_scored_nodes(&mut nodes);
        nodes.truncate(self.top_k);

        record_retrieval(self.retriever_name(), started.elapsed(), nodes.len());
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Node> {
        vec![
            Node::with_id("1", "Rust is a systems programming language"),
            Node::with_id("2", "Tokio is an async runtime for Rust, written in Rust"),
            Node::with_id("3", "Python is a scripting language"),
        ]
    }

    #[tokio::test]
    async fn test_ranks_by_term_frequency_and_rarity() {
        let retriever = KeywordRetriever::new(corpus(), 3).unwrap();

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("async rust"))
            .await
            .unwrap();

        assert_eq!(nodes[0].id(), "2");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_no_matching_terms_returns_empty() {
        let retriever = KeywordRetriever::new(corpus(), 3).unwrap();

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("haskell"))
            .await
            .unwrap();

        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_is_upper_bound() {
        let retriever = KeywordRetriever::new(corpus(), 1).unwrap();

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("language"))
            .await
            .unwrap();

        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_idf_prefers_rare_terms() {
        let retriever = KeywordRetriever::new(corpus(), 3).unwrap();
        assert!(retriever.idf("python") > retriever.idf("language"));
        assert!(retriever.idf("missing") > retriever.idf("python"));
    }

    #[test]
    fn test_invalid_params() {
        assert!(KeywordRetriever::with_params(corpus(), 3, 1.2, 1.5).is_err());
        assert!(KeywordRetriever::new(corpus(), 0).is_err());
    }
}
