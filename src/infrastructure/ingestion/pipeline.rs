//! Documents in, embedded nodes out

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::SplitterSettings;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::Document;
use crate::domain::splitter::{ChunkingConfig, TextSplitter};
use crate::domain::store::VectorStore;
use crate::domain::{DomainError, Node, QueryContext};
use crate::infrastructure::splitter::SentenceSplitter;

pub const SOURCE_METADATA_KEY: &str = "source";
pub const CHUNK_INDEX_METADATA_KEY: &str = "chunk_index";
pub const DOCUMENT_ID_METADATA_KEY: &str = "document_id";

/// Splits documents into nodes, optionally embeds them and writes them to a
/// vector store. Every node gets a fresh id and carries its document's metadata
/// plus `document_id`, `chunk_index` and, when known, `source`.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    splitter: Arc<dyn TextSplitter>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl IngestionPipeline {
    pub fn new(splitter: Arc<dyn TextSplitter>) -> Self {
        Self {
            splitter,
            embedder: None,
            store: None,
        }
    }

    /// Sentence splitting configured from settings
    pub fn from_settings(settings: &SplitterSettings) -> Result<Self, DomainError> {
        let splitter = SentenceSplitter::new(ChunkingConfig::new(
            settings.chunk_size,
            settings.chunk_overlap,
        ))?
        .with_paragraph_separator(settings.paragraph_separator.clone())
        .with_secondary_regex(&settings.secondary_regex)?;

        Ok(Self::new(Arc::new(splitter)))
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Nodes are added to `store` after embedding; requires an embedder
    pub fn with_vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Splits without embedding or storing
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Node> {
        documents.iter().flat_map(|doc| self.split_document(doc)).collect()
    }

    fn split_document(&self, document: &Document) -> Vec<Node> {
        self.splitter
            .split(&document.content)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let mut node = Node::new(chunk)
                    .with_all_metadata(document.metadata.clone())
                    .with_metadata(DOCUMENT_ID_METADATA_KEY, document.id.clone())
                    .with_metadata(CHUNK_INDEX_METADATA_KEY, index);
                if let Some(source) = &document.source {
                    node = node.with_metadata(SOURCE_METADATA_KEY, source.clone());
                }
                node
            })
            .collect()
    }

    /// Runs every configured stage and returns the produced nodes
    pub async fn run(&self, ctx: &QueryContext, documents: Vec<Document>) -> Result<Vec<Node>, DomainError> {
        if self.store.is_some() && self.embedder.is_none() {
            return Err(DomainError::invalid_config(
                "ingestion into a vector store needs an embedder",
            ));
        }

        let started = Instant::now();
        ctx.check()?;
        let mut nodes = self.split_documents(&documents);
        debug!(
            splitter = self.splitter.name(),
            documents = documents.len(),
            nodes = nodes.len(),
            "Split documents"
        );

        if let Some(embedder) = &self.embedder {
            let texts: Vec<String> = nodes.iter().map(|n| n.content().to_string()).collect();
            let embeddings = ctx.run(embedder.embed_texts(ctx, &texts)).await?;
            if embeddings.len() != nodes.len() {
                return Err(DomainError::upstream(
                    embedder.provider_name(),
                    format!("expected {} embeddings, got {}", nodes.len(), embeddings.len()),
                ));
            }
            for (node, embedding) in nodes.iter_mut().zip(embeddings) {
                node.set_embedding(embedding)?;
            }
        }

        if let Some(store) = &self.store {
            let ids = ctx.run(store.add(ctx, nodes.clone())).await?;
            debug!(store = store.store_type(), added = ids.len(), "Stored nodes");
        }

        info!(
            documents = documents.len(),
            nodes = nodes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion finished"
        );
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::splitter::Tokenizer;
    use crate::infrastructure::splitter::{TokenTextSplitter, WhitespaceTokenizer};
    use crate::infrastructure::store::InMemoryVectorStore;
    use serde_json::json;

    fn splitter() -> Arc<dyn TextSplitter> {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(WhitespaceTokenizer);
        Arc::new(
            TokenTextSplitter::new(ChunkingConfig::new(3, 0))
                .unwrap()
                .with_tokenizer(tokenizer),
        )
    }

    #[tokio::test]
    async fn test_split_adds_provenance_metadata() {
        let pipeline = IngestionPipeline::new(splitter());
        let document = Document::new("doc-1", "a b c d e")
            .with_source("notes.txt")
            .with_metadata("lang", "en");

        let nodes = pipeline
            .run(&QueryContext::background(), vec![document])
            .await
            .unwrap();

        let contents: Vec<&str> = nodes.iter().map(|n| n.content()).collect();
        assert_eq!(contents, vec!["a b c", "d e"]);
        assert_eq!(nodes[1].metadata()[CHUNK_INDEX_METADATA_KEY], json!(1));
        assert_eq!(nodes[1].metadata_str(DOCUMENT_ID_METADATA_KEY), Some("doc-1"));
        assert_eq!(nodes[1].metadata_str(SOURCE_METADATA_KEY), Some("notes.txt"));
        assert_eq!(nodes[1].metadata_str("lang"), Some("en"));
        assert_ne!(nodes[0].id(), nodes[1].id());
        assert!(nodes[0].embedding().is_none());
    }

    #[tokio::test]
    async fn test_embeds_and_stores() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(MockEmbeddingProvider::new("mock", 4));
        let pipeline = IngestionPipeline::new(splitter())
            .with_embedder(embedder.clone())
            .with_vector_store(store.clone());

        let nodes = pipeline
            .run(
                &QueryContext::background(),
                vec![Document::new("d1", "one two three four"), Document::new("d2", "five")],
            )
            .await
            .unwrap();

        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.embedding().map(<[f32]>::len) == Some(4)));
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_store_without_embedder_rejected() {
        let pipeline =
            IngestionPipeline::new(splitter()).with_vector_store(Arc::new(InMemoryVectorStore::new()));

        let err = pipeline
            .run(&QueryContext::background(), vec![Document::new("d", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfig { .. }));
    }

    #[test]
    fn test_from_settings() {
        let settings = SplitterSettings {
            chunk_size: 64,
            chunk_overlap: 8,
            ..SplitterSettings::default()
        };
        let pipeline = IngestionPipeline::from_settings(&settings).unwrap();
        assert_eq!(pipeline.split_documents(&[Document::new("d", "")]).len(), 0);
    }
}
