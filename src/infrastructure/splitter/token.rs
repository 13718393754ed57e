//! Token-window splitter: separators first, proportional cuts as a last resort

use std::sync::Arc;

use tracing::{debug, warn};

use super::split_utils::split_keep_separator;
use super::tokenizer::default_tokenizer;
use crate::domain::splitter::{ChunkingConfig, MetadataAwareTextSplitter, TextSplitter, Tokenizer};
use crate::domain::DomainError;

const DEFAULT_METADATA_FLOOR: usize = 1;

/// Splits on a separator into chunks of at most `chunk_size` tokens
#[derive(Debug, Clone)]
pub struct TokenTextSplitter {
    config: ChunkingConfig,
    tokenizer: Arc<dyn Tokenizer>,
    separator: String,
    backup_separators: Vec<String>,
    metadata_floor: usize,
}

impl TokenTextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, DomainError> {
        config.validate()?;

        Ok(Self {
            config,
            tokenizer: default_tokenizer(),
            separator: " ".to_string(),
            backup_separators: vec!["\n".to_string()],
            metadata_floor: DEFAULT_METADATA_FLOOR,
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_backup_separators(mut self, separators: Vec<String>) -> Self {
        self.backup_separators = separators;
        self
    }

    fn split_with_budget(&self, text: &str, chunk_size: usize) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = self.split_pieces(text, chunk_size);
        let chunks = self.merge(pieces, chunk_size);

        debug!(chunks = chunks.len(), chunk_size, "Token split complete");
        chunks
    }

    fn split_pieces(&self, text: &str, chunk_size: usize) -> Vec<String> {
        if self.tokenizer.count_tokens(text) <= chunk_size {
            return vec![text.to_string()];
        }

        let separators = std::iter::once(&self.separator).chain(self.backup_separators.iter());
        let parts = separators
            .map(|sep| split_keep_separator(text, sep))
            .find(|parts| parts.len() > 1)
            .unwrap_or_else(|| self.split_proportionally(text, chunk_size));

        if parts.len() <= 1 {
            return parts;
        }

        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            if self.tokenizer.count_tokens(&part) <= chunk_size {
                pieces.push(part);
            } else {
                pieces.extend(self.split_pieces(&part, chunk_size));
            }
        }
        pieces
    }

    /// Cuts `text` into equal character spans, one per `chunk_size` tokens
    fn split_proportionally(&self, text: &str, chunk_size: usize) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let tokens = self.tokenizer.count_tokens(text);
        let parts = tokens.div_ceil(chunk_size).clamp(1, chars.len().max(1));
        let span = chars.len().div_ceil(parts).max(1);

        chars
            .chunks(span)
            .map(|c| c.iter().collect::<String>())
            .collect()
    }

    fn merge(&self, pieces: Vec<String>, chunk_size: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_len = 0;

        for piece in pieces {
            let tokens = self.tokenizer.count_tokens(&piece);
            if tokens > chunk_size {
                warn!(tokens, chunk_size, "Single piece exceeds chunk size; admitting it alone");
            }

            if current_len + tokens > chunk_size {
                push_chunk(&mut chunks, &current);

                // Keep at most `chunk_overlap` tokens, and only what still fits
                while !current.is_empty()
                    && (current_len > self.config.chunk_overlap
                        || current_len + tokens > chunk_size)
                {
                    let (_, first) = current.remove(0);
                    current_len -= first;
                }
            }

            current_len += tokens;
            current.push((piece, tokens));
        }

        push_chunk(&mut chunks, &current);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, current: &[(String, usize)]) {
    let chunk: String = current.iter().map(|(text, _)| text.as_str()).collect();
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}

impl TextSplitter for TokenTextSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_with_budget(text, self.config.chunk_size)
    }

    fn name(&self) -> &'static str {
        "token"
    }
}

impl MetadataAwareTextSplitter for TokenTextSplitter {
    fn split_with_metadata(&self, text: &str, metadata: &str) -> Result<Vec<String>, DomainError> {
        let metadata_tokens = self.tokenizer.count_tokens(metadata);
        let effective = self.config.chunk_size.saturating_sub(metadata_tokens);

        if effective < self.metadata_floor {
            return Err(DomainError::budget_exhausted(format!(
                "metadata uses {} of {} tokens",
                metadata_tokens, self.config.chunk_size
            )));
        }

        Ok(self.split_with_budget(text, effective))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::splitter::tokenizer::ByteLengthTokenizer;

    fn splitter(size: usize, overlap: usize) -> TokenTextSplitter {
        TokenTextSplitter::new(ChunkingConfig::new(size, overlap)).unwrap()
    }

    #[test]
    fn test_overlapping_windows() {
        let chunks = splitter(3, 1).split("A B C D E");
        assert_eq!(chunks, vec!["A B C", "C D E"]);
    }

    #[test]
    fn test_no_overlap() {
        let chunks = splitter(2, 0).split("a b c d e");
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(splitter(5, 0).split("").is_empty());
    }

    #[test]
    fn test_backup_separator() {
        let splitter = splitter(4, 0).with_separator("|");
        let chunks = splitter.split("a b\nc d\ne f");

        assert_eq!(chunks, vec!["a b\nc d", "e f"]);
    }

    #[test]
    fn test_proportional_fallback() {
        let splitter = splitter(4, 0).with_tokenizer(Arc::new(ByteLengthTokenizer));
        let chunks = splitter.split("abcdefghij");

        assert!(chunks.iter().all(|c| c.len() <= 4));
        assert_eq!(chunks.concat(), "abcdefghij");
    }

    #[test]
    fn test_metadata_budget_exhausted() {
        let splitter = splitter(3, 0);

        assert!(splitter.split_with_metadata("a b c", "k: v").is_ok());
        let err = splitter.split_with_metadata("a b c", "a b c d").unwrap_err();
        assert!(matches!(err, DomainError::BudgetExhausted { .. }));
    }
}
