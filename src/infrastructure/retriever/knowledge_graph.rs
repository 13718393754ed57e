//! Knowledge-graph retrieval: query keywords seed a bounded walk over triplets

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::llm::LlmProvider;
use crate::domain::node::{sort_scored_nodes, Triplet};
use crate::domain::prompt::defaults::kg_keyword_extract_prompt;
use crate::domain::prompt::{take_prompt, PromptDictionary, PromptMixin};
use crate::domain::retriever::Retriever;
use crate::domain::store::GraphStore;
use crate::domain::{DomainError, Node, PromptTemplate, QueryBundle, QueryContext, ScoredNode};
use crate::infrastructure::observability::record_retrieval;
use crate::infrastructure::predict::predict;

pub const DEFAULT_KG_DEPTH: usize = 2;
pub const DEFAULT_MAX_KEYWORDS: usize = 10;
const KEYWORD_PROMPT_KEY: &str = "keyword_extract_template";
const KEYWORD_PROMPT_VARS: &[&str] = &["max_keywords", "query_str"];
const MIN_FALLBACK_KEYWORD_LEN: usize = 3;

/// Walks outward from query entities up to `depth` hops. A triplet found at
/// hop `d` scores `1 / (d + 1)`; each entity is expanded at most once.
#[derive(Debug, Clone)]
pub struct KnowledgeGraphRetriever {
    graph: Arc<dyn GraphStore>,
    llm: Option<Arc<dyn LlmProvider>>,
    keyword_prompt: PromptTemplate,
    depth: usize,
    max_keywords: usize,
    top_k: Option<usize>,
}

impl KnowledgeGraphRetriever {
    /// Without an LLM, keywords are the query's words
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self {
            graph,
            llm: None,
            keyword_prompt: kg_keyword_extract_prompt(),
            depth: DEFAULT_KG_DEPTH,
            max_keywords: DEFAULT_MAX_KEYWORDS,
            top_k: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Result<Self, DomainError> {
        if depth == 0 {
            return Err(DomainError::invalid_config("graph depth must be greater than 0"));
        }
        self.depth = depth;
        Ok(self)
    }

    pub fn with_max_keywords(mut self, max_keywords: usize) -> Self {
        self.max_keywords = max_keywords.max(1);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    async fn keywords(&self, ctx: &QueryContext, query: &str) -> Result<Vec<String>, DomainError> {
        let extracted = match &self.llm {
            Some(llm) => {
                let max = self.max_keywords.to_string();
                let prompt = self
                    .keyword_prompt
                    .format(&[("max_keywords", max.as_str()), ("query_str", query)])?;
                let output = predict(llm.as_ref(), ctx, "kg_keywords", &prompt).await?;
                let parsed = parse_keywords(&output);
                if parsed.is_empty() {
                    warn!("Keyword extraction returned nothing usable; using query words");
                }
                parsed
            }
            None => Vec::new(),
        };

        let keywords = if extracted.is_empty() {
            fallback_keywords(query)
        } else {
            extracted
        };

        Ok(keywords.into_iter().take(self.max_keywords).collect())
    }
}

/// Reads the comma-separated list after `KEYWORDS:`
fn parse_keywords(output: &str) -> Vec<String> {
    let Some(line) = output
        .lines()
        .find(|line| line.trim_start().to_uppercase().starts_with("KEYWORDS:"))
    else {
        return Vec::new();
    };

    let (_, list) = line.split_once(':').unwrap_or(("", ""));
    let mut keywords: Vec<String> = Vec::new();
    for keyword in list.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }
    keywords
}

fn fallback_keywords(query: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in query.unicode_words().filter(|w| w.chars().count() >= MIN_FALLBACK_KEYWORD_LEN) {
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Spellings tried against the graph's exact-match subjects
fn subject_variants(keyword: &str) -> Vec<String> {
    let lower = keyword.to_lowercase();
    let mut chars = lower.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    let mut variants = vec![keyword.to_string()];
    for variant in [lower, capitalized] {
        if !variant.is_empty() && !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}

fn triplet_node(triplet: &Triplet, depth: usize) -> ScoredNode {
    let node = Node::with_id(triplet.to_string(), triplet.to_string())
        .with_metadata("kg_subject", triplet.subject.clone())
        .with_metadata("kg_relation", triplet.relation.clone())
        .with_metadata("kg_object", triplet.object.clone())
        .with_metadata("kg_depth", depth);
    ScoredNode::new(node, 1.0 / (depth as f32 + 1.0))
}

#[async_trait]
impl Retriever for KnowledgeGraphRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let started = Instant::now();
        let keywords = self.keywords(ctx, query.query_str()).await?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_triplets: HashSet<Triplet> = HashSet::new();
        let mut frontier: VecDeque<(String, usize)> = keywords
            .iter()
            .flat_map(|k| subject_variants(k))
            .map(|entity| (entity, 0))
            .collect();
        let mut nodes = Vec::new();

        while let Some((entity, depth)) = frontier.pop_front() {
            if depth >= self.depth || !visited.insert(entity.clone()) {
                continue;
            }

            let edges = ctx.run(self.graph.get(ctx, &entity)).await?;
            for (relation, object) in edges {
                let triplet = Triplet::new(entity.clone(), relation, object.clone());
                if seen_triplets.insert(triplet.clone()) {
                    nodes.push(triplet_node(&triplet, depth));
                }
                if !visited.contains(&object) {
                    frontier.push_back((object, depth + 1));
                }
            }
        }

        sort_scored_nodes(&mut nodes);
        if let Some(top_k) = self.top_k {
            nodes.truncate(top_k);
        }

        debug!(
            keywords = keywords.len(),
            entities = visited.len(),
            triplets = nodes.len(),
            "Graph traversal complete"
        );
        record_retrieval(self.retriever_name(), started.elapsed(), nodes.len());
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "knowledge_graph"
    }
}

impl PromptMixin for KnowledgeGraphRetriever {
    fn get_prompts(&self) -> PromptDictionary {
        PromptDictionary::from([(KEYWORD_PROMPT_KEY.to_string(), self.keyword_prompt.clone())])
    }

    fn update_prompts(&mut self, mut prompts: PromptDictionary) -> Result<(), DomainError> {
        if let Some(template) = take_prompt(&mut prompts, KEYWORD_PROMPT_KEY, KEYWORD_PROMPT_VARS)? {
            self.keyword_prompt = template;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::infrastructure::store::InMemoryGraphStore;

    async fn graph() -> Arc<InMemoryGraphStore> {
        Arc::new(
            InMemoryGraphStore::from_triplets(vec![
                Triplet::new("Rust", "has", "Cargo"),
                Triplet::new("Cargo", "uses", "crates.io"),
                Triplet::new("crates.io", "hosts", "Tokio"),
                Triplet::new("Tokio", "depends_on", "Rust"),
            ])
            .await,
        )
    }

    #[tokio::test]
    async fn test_walk_scores_by_depth() {
        let retriever = KnowledgeGraphRetriever::new(graph().await);

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("What does Rust have?"))
            .await
            .unwrap();

        let found: Vec<(&str, f32)> = nodes.iter().map(|n| (n.content(), n.score)).collect();
        assert_eq!(
            found,
            vec![("(Rust, has, Cargo)", 1.0), ("(Cargo, uses, crates.io)", 0.5)]
        );
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let retriever = KnowledgeGraphRetriever::new(graph().await).with_depth(10).unwrap();

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("rust"))
            .await
            .unwrap();

        assert_eq!(nodes.len(), 4);
    }

    #[tokio::test]
    async fn test_llm_keywords() {
        let llm = Arc::new(MockLlmProvider::new("mock").with_reply("KEYWORDS: Tokio, runtime"));
        let retriever = KnowledgeGraphRetriever::new(graph().await)
            .with_llm(llm.clone())
            .with_depth(1)
            .unwrap();

        let nodes = retriever
            .retrieve(&QueryContext::background(), &QueryBundle::new("which async runtime?"))
            .await
            .unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].content(), "(Tokio, depends_on, Rust)");
        assert!(llm.prompts()[0].contains("which async runtime?"));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords("Sure!\nKEYWORDS: a, b , a,"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(parse_keywords("no list here").is_empty());
    }

    #[test]
    fn test_prompt_override_validated() {
        let mut retriever = KnowledgeGraphRetriever::new(Arc::new(InMemoryGraphStore::new()));

        let bad = PromptDictionary::from([(
            KEYWORD_PROMPT_KEY.to_string(),
            PromptTemplate::new("{unknown}"),
        )]);
        assert!(retriever.update_prompts(bad).is_err());

        let good = PromptDictionary::from([(
            KEYWORD_PROMPT_KEY.to_string(),
            PromptTemplate::new("Keywords for {query_str}:"),
        )]);
        retriever.update_prompts(good).unwrap();
        assert_eq!(
            retriever.get_prompts()[KEYWORD_PROMPT_KEY].content(),
            "Keywords for {query_str}:"
        );
    }
}
