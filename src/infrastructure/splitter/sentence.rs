//! Sentence-aware splitter: paragraphs, then sentences, then clauses, words and characters

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::split_utils::{postprocess_chunks, SplitRule};
use super::tokenizer::default_tokenizer;
use crate::domain::splitter::{ChunkingConfig, MetadataAwareTextSplitter, TextSplitter, Tokenizer};
use crate::domain::DomainError;

pub const DEFAULT_PARAGRAPH_SEPARATOR: &str = "\n\n\n";
pub const DEFAULT_SECONDARY_REGEX: &str = "[^,.;。？！]+[,.;。？！]?";
const DEFAULT_METADATA_FLOOR: usize = 50;

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    tokens: usize,
    is_sentence: bool,
}

/// Splits text preferring whole sentences, with token overlap between chunks
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    config: ChunkingConfig,
    tokenizer: Arc<dyn Tokenizer>,
    /// Rules whose pieces count as whole sentences
    sentence_rules: Vec<SplitRule>,
    /// Fallbacks for sentences that exceed the budget
    sub_sentence_rules: Vec<SplitRule>,
    metadata_floor: usize,
}

impl SentenceSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let secondary = Regex::new(DEFAULT_SECONDARY_REGEX)
            .map_err(|e| DomainError::internal(format!("secondary regex: {}", e)))?;

        Ok(Self {
            config,
            tokenizer: default_tokenizer(),
            sentence_rules: vec![
                SplitRule::separator(DEFAULT_PARAGRAPH_SEPARATOR),
                SplitRule::Sentences,
            ],
            sub_sentence_rules: vec![
                SplitRule::Regex(secondary),
                SplitRule::separator(" "),
                SplitRule::Chars,
            ],
            metadata_floor: DEFAULT_METADATA_FLOOR,
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_paragraph_separator(mut self, separator: impl Into<String>) -> Self {
        self.sentence_rules[0] = SplitRule::separator(separator);
        self
    }

    pub fn with_secondary_regex(mut self, pattern: &str) -> Result<Self, DomainError> {
        let regex = Regex::new(pattern)
            .map_err(|e| DomainError::invalid_config(format!("invalid secondary regex: {}", e)))?;
        self.sub_sentence_rules[0] = SplitRule::Regex(regex);
        Ok(self)
    }

    /// Smallest chunk budget left after metadata before splitting is refused
    pub fn with_metadata_floor(mut self, floor: usize) -> Self {
        self.metadata_floor = floor;
        self
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    fn split_with_budget(&self, text: &str, chunk_size: usize) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = self.split_pieces(text, chunk_size);
        let chunks = self.merge(pieces, chunk_size);

        debug!(chunks = chunks.len(), chunk_size, "Sentence split complete");
        chunks
    }

    fn split_pieces(&self, text: &str, chunk_size: usize) -> Vec<Piece> {
        let tokens = self.tokenizer.count_tokens(text);
        if tokens <= chunk_size {
            return vec![Piece {
                text: text.to_string(),
                tokens,
                is_sentence: true,
            }];
        }

        let (parts, is_sentence) = self.apply_rules(text);
        if parts.len() <= 1 {
            // Nothing left to split on: admitted whole
            return vec![Piece {
                text: text.to_string(),
                tokens,
                is_sentence: false,
            }];
        }

        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            let tokens = self.tokenizer.count_tokens(&part);
            if tokens <= chunk_size {
                pieces.push(Piece {
                    text: part,
                    tokens,
                    is_sentence,
                });
            } else {
                pieces.extend(self.split_pieces(&part, chunk_size));
            }
        }
        pieces
    }

    fn apply_rules(&self, text: &str) -> (Vec<String>, bool) {
        for rule in &self.sentence_rules {
            let parts = rule.apply(text);
            if parts.len() > 1 {
                return (parts, true);
            }
        }

        let mut parts = vec![text.to_string()];
        for rule in &self.sub_sentence_rules {
            parts = rule.apply(text);
            if parts.len() > 1 {
                break;
            }
        }
        (parts, false)
    }

    fn merge(&self, pieces: Vec<Piece>, chunk_size: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<(String, usize)> = Vec::new();
        let mut current_len = 0;
        let mut new_chunk = true;
        let mut index = 0;

        while index < pieces.len() {
            let piece = &pieces[index];

            if current_len + piece.tokens > chunk_size && !new_chunk {
                self.close_chunk(&mut chunks, &mut current, &mut current_len);
                new_chunk = true;
                continue;
            }

            if new_chunk {
                // Overlap carried from the previous chunk yields to the next piece
                while current_len + piece.tokens > chunk_size && !current.is_empty() {
                    let (_, tokens) = current.remove(0);
                    current_len -= tokens;
                }
            }

            current_len += piece.tokens;
            current.push((piece.text.clone(), piece.tokens));
            new_chunk = false;
            index += 1;
        }

        if !new_chunk {
            chunks.push(join_pieces(&current));
        }

        postprocess_chunks(chunks)
    }

    fn close_chunk(
        &self,
        chunks: &mut Vec<String>,
        current: &mut Vec<(String, usize)>,
        current_len: &mut usize,
    ) {
        chunks.push(join_pieces(current));

        let last = std::mem::take(current);
        *current_len = 0;

        for (text, tokens) in last.into_iter().rev() {
            if *current_len + tokens > self.config.chunk_overlap {
                break;
            }
            *current_len += tokens;
            current.insert(0, (text, tokens));
        }
    }
}

fn join_pieces(pieces: &[(String, usize)]) -> String {
    pieces.iter().map(|(text, _)| text.as_str()).collect()
}

impl TextSplitter for SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_with_budget(text, self.config.chunk_size)
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}

impl MetadataAwareTextSplitter for SentenceSplitter {
    fn split_with_metadata(&self, text: &str, metadata: &str) -> Result<Vec<String>, DomainError> {
        let metadata_tokens = self.tokenizer.count_tokens(metadata);
        let effective = self.config.chunk_size.saturating_sub(metadata_tokens);
        let floor = self.metadata_floor.min(self.config.chunk_size).max(1);

        if effective < floor {
            return Err(DomainError::budget_exhausted(format!(
                "metadata uses {} of {} tokens, leaving {} (minimum {})",
                metadata_tokens, self.config.chunk_size, effective, floor
            )));
        }

        Ok(self.split_with_budget(text, effective))
    }
}
