//! Packs text chunks into as few prompt-sized chunks as possible

use std::sync::Arc;

use crate::domain::splitter::Tokenizer;
use crate::domain::PromptTemplate;
use crate::infrastructure::splitter::ByteLengthTokenizer;

pub const DEFAULT_COMPACT_SIZE: usize = 4096;
const CHUNK_SEPARATOR: &str = "\n\n";

/// Greedy packer measured by an injected tokenizer. The default measures bytes.
#[derive(Debug, Clone)]
pub struct Compactor {
    tokenizer: Arc<dyn Tokenizer>,
    budget: usize,
}

impl Default for Compactor {
    fn default() -> Self {
        Self::new(Arc::new(ByteLengthTokenizer), DEFAULT_COMPACT_SIZE)
    }
}

impl Compactor {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, budget: usize) -> Self {
        Self {
            tokenizer,
            budget: budget.max(1),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Budget left for context once `template` is rendered around `query_str`
    pub fn available(&self, template: &PromptTemplate, query_str: &str) -> usize {
        let blanks: Vec<(&str, &str)> = template
            .required_variables()
            .into_iter()
            .map(|name| if name == "query_str" { (name, query_str) } else { (name, "") })
            .collect();

        let overhead = template
            .format(&blanks)
            .map(|rendered| self.tokenizer.count_tokens(&rendered))
            .unwrap_or_else(|_| self.tokenizer.count_tokens(template.content()));

        self.budget.saturating_sub(overhead).max(1)
    }

    /// Concatenates neighbours with blank lines while they fit. A chunk larger
    /// than the budget is admitted on its own rather than cut.
    pub fn compact(&self, template: &PromptTemplate, query_str: &str, chunks: &[String]) -> Vec<String> {
        let available = self.available(template, query_str);
        let mut packed: Vec<String> = Vec::new();
        let mut current = String::new();

        for chunk in chunks.iter().filter(|c| !c.trim().is_empty()) {
            if current.is_empty() {
                current = chunk.clone();
                continue;
            }

            let candidate = format!("{}{}{}", current, CHUNK_SEPARATOR, chunk);
            if self.tokenizer.count_tokens(&candidate) <= available {
                current = candidate;
            } else {
                packed.push(std::mem::replace(&mut current, chunk.clone()));
            }
        }

        if !current.is_empty() {
            packed.push(current);
        }
        packed
    }
}

/// Joins neighbours pairwise regardless of size; always shrinks lists longer than one
pub fn merge_pairs(chunks: Vec<String>) -> Vec<String> {
    chunks
        .chunks(2)
        .map(|pair| pair.join(CHUNK_SEPARATOR))
        .collect()
}
