use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// Strategy used to turn retrieved chunks into an answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Refine,
    #[default]
    Compact,
    SimpleSummarize,
    TreeSummarize,
    Generation,
    NoText,
    ContextOnly,
    Accumulate,
    CompactAccumulate,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refine => "refine",
            Self::Compact => "compact",
            Self::SimpleSummarize => "simple_summarize",
            Self::TreeSummarize => "tree_summarize",
            Self::Generation => "generation",
            Self::NoText => "no_text",
            Self::ContextOnly => "context_only",
            Self::Accumulate => "accumulate",
            Self::CompactAccumulate => "compact_accumulate",
        }
    }

    pub fn all() -> [ResponseMode; 9] {
        [
            Self::Refine,
            Self::Compact,
            Self::SimpleSummarize,
            Self::TreeSummarize,
            Self::Generation,
            Self::NoText,
            Self::ContextOnly,
            Self::Accumulate,
            Self::CompactAccumulate,
        ]
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| DomainError::invalid_config(format!("unknown response mode '{}'", s)))
    }
}
