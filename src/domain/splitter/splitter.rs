use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Splits text into chunks that fit a token budget
pub trait TextSplitter: Send + Sync + Debug {
    /// Chunks in source order. Empty input yields no chunks.
    fn split(&self, text: &str) -> Vec<String>;

    fn name(&self) -> &'static str;
}

/// A splitter that reserves part of the budget for metadata rendered with each chunk
pub trait MetadataAwareTextSplitter: TextSplitter {
    /// Fails with `BudgetExhausted` when the metadata leaves too little room
    fn split_with_metadata(&self, text: &str, metadata: &str) -> Result<Vec<String>, DomainError>;
}

/// A sentence together with its surrounding window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceWindowItem {
    pub index: usize,
    pub sentence: String,
    pub window: String,
}
