//! Markdown-aware splitter: code fences stay whole, prose splits on headers

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::tokenizer::default_tokenizer;
use crate::domain::splitter::{ChunkingConfig, MetadataAwareTextSplitter, TextSplitter, Tokenizer};
use crate::domain::DomainError;

static HEADER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s").expect("header pattern is valid"));

const SECTION_SEPARATOR: &str = "\n\n";
const DEFAULT_METADATA_FLOOR: usize = 1;
/// Fallbacks for oversized prose: paragraphs, lines, words
const PROSE_SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Prose(String),
    Code {
        open: String,
        body: Vec<String>,
        close: Option<String>,
    },
}

/// Splits markdown without breaking code fences or merging across headers
/// unless both sections fit together. Chunks do not overlap.
#[derive(Debug, Clone)]
pub struct MarkdownSplitter {
    config: ChunkingConfig,
    tokenizer: Arc<dyn Tokenizer>,
    metadata_floor: usize,
}

impl MarkdownSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, DomainError> {
        config.validate()?;

        Ok(Self {
            config,
            tokenizer: default_tokenizer(),
            metadata_floor: DEFAULT_METADATA_FLOOR,
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_metadata_floor(mut self, floor: usize) -> Self {
        self.metadata_floor = floor;
        self
    }

    fn split_with_budget(&self, text: &str, budget: usize) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let units: Vec<String> = parse_blocks(text)
            .into_iter()
            .flat_map(|block| self.units(block, budget))
            .collect();
        let chunks = self.merge(units, SECTION_SEPARATOR, budget);

        debug!(chunks = chunks.len(), budget, "Markdown split complete");
        chunks
    }

    fn tokens(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    fn units(&self, block: Block, budget: usize) -> Vec<String> {
        match block {
            Block::Prose(text) => split_sections(&text)
                .into_iter()
                .flat_map(|section| self.fit(&section, &PROSE_SEPARATORS, budget))
                .collect(),
            Block::Code { open, body, close } => self.fit_code(open, body, close, budget),
        }
    }

    /// Recursively cuts `text` with the next separator until every part fits
    fn fit(&self, text: &str, separators: &[&str], budget: usize) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if self.tokens(text) <= budget {
            return vec![text.to_string()];
        }

        let Some((sep, rest)) = separators.split_first() else {
            // A single word larger than the budget
            return vec![text.to_string()];
        };

        let parts: Vec<String> = text
            .split(sep)
            .flat_map(|part| self.fit(part, rest, budget))
            .collect();

        self.merge(parts, sep, budget)
    }

    fn fit_code(
        &self,
        open: String,
        body: Vec<String>,
        close: Option<String>,
        budget: usize,
    ) -> Vec<String> {
        let render = |lines: &[String]| {
            let mut out = Vec::with_capacity(lines.len() + 2);
            out.push(open.as_str());
            out.extend(lines.iter().map(String::as_str));
            if let Some(close) = &close {
                out.push(close.as_str());
            }
            out.join("\n")
        };

        let whole = render(&body);
        if self.tokens(&whole) <= budget || body.len() <= 1 {
            return vec![whole];
        }

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for line in body {
            current.push(line);
            if current.len() > 1 && self.tokens(&render(&current)) > budget {
                let overflow = current.pop().into_iter().collect::<Vec<_>>();
                chunks.push(render(&current));
                current = overflow;
            }
        }
        if !current.is_empty() {
            chunks.push(render(&current));
        }
        chunks
    }

    /// Greedy merge of consecutive parts while the joined text fits
    fn merge(&self, parts: Vec<String>, sep: &str, budget: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for part in parts {
            if current.is_empty() {
                current = part;
                continue;
            }

            let candidate = format!("{}{}{}", current, sep, part);
            if self.tokens(&candidate) <= budget {
                current = candidate;
            } else {
                chunks.push(std::mem::replace(&mut current, part));
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

impl TextSplitter for MarkdownSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        self.split_with_budget(text, self.config.chunk_size)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

impl MetadataAwareTextSplitter for MarkdownSplitter {
    fn split_with_metadata(&self, text: &str, metadata: &str) -> Result<Vec<String>, DomainError> {
        let metadata_tokens = self.tokens(metadata);
        let effective = self.config.chunk_size.saturating_sub(metadata_tokens);
        let floor = self.metadata_floor.max(1);

        if effective < floor {
            return Err(DomainError::budget_exhausted(format!(
                "metadata uses {} of {} tokens, leaving {} (minimum {})",
                metadata_tokens, self.config.chunk_size, effective, floor
            )));
        }

        Ok(self.split_with_budget(text, effective))
    }
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Partitions the document into prose and fenced code blocks
fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some(marker) = fence_marker(line) else {
            prose.push(line);
            continue;
        };

        if !prose.is_empty() {
            blocks.push(Block::Prose(prose.join("\n")));
            prose.clear();
        }

        let mut body = Vec::new();
        let mut close = None;
        for inner in lines.by_ref() {
            if inner.trim_start().starts_with(marker) {
                close = Some(inner.to_string());
                break;
            }
            body.push(inner.to_string());
        }

        blocks.push(Block::Code {
            open: line.to_string(),
            body,
            close,
        });
    }

    if !prose.is_empty() {
        blocks.push(Block::Prose(prose.join("\n")));
    }
    blocks
}

/// Cuts prose before every header line
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if HEADER_PATTERN.is_match(line) && !current.is_empty() {
            sections.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }

    sections
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}
