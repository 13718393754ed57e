use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::node::QueryBundle;
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryContext};

/// One chosen candidate, by zero-based index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSelection {
    pub index: usize,
    pub reason: String,
}

impl SingleSelection {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Selections in the order the selector ranked them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorResult {
    pub selections: Vec<SingleSelection>,
}

impl SelectorResult {
    pub fn new(selections: Vec<SingleSelection>) -> Self {
        Self { selections }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.selections.iter().map(|s| s.index).collect()
    }

    pub fn reasons(&self) -> Vec<&str> {
        self.selections.iter().map(|s| s.reason.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

/// Picks the candidates relevant to a query
#[async_trait]
pub trait Selector: Send + Sync + Debug {
    async fn select(
        &self,
        ctx: &QueryContext,
        choices: &[ToolMetadata],
        query: &QueryBundle,
    ) -> Result<SelectorResult, DomainError>;
}
