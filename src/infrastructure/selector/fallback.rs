//! Selectors that never call an LLM

use async_trait::async_trait;

use crate::domain::selector::{Selector, SelectorResult, SingleSelection};
use crate::domain::tool::ToolMetadata;
use crate::domain::{DomainError, QueryBundle, QueryContext};

/// Always picks the first choice
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoiceSelector;

#[async_trait]
impl Selector for FirstChoiceSelector {
    async fn select(
        &self,
        ctx: &QueryContext,
        choices: &[ToolMetadata],
        _query: &QueryBundle,
    ) -> Result<SelectorResult, DomainError> {
        ctx.check()?;
        if choices.is_empty() {
            return Err(DomainError::bad_input("selector needs at least one choice"));
        }
        Ok(SelectorResult::new(vec![SingleSelection::new(0, "first choice")]))
    }
}

/// Picks every choice, in order
#[derive(Debug, Clone, Copy, Default)]
pub struct AllChoicesSelector;

#[async_trait]
impl Selector for AllChoicesSelector {
    async fn select(
        &self,
        ctx: &QueryContext,
        choices: &[ToolMetadata],
        _query: &QueryBundle,
    ) -> Result<SelectorResult, DomainError> {
        ctx.check()?;
        if choices.is_empty() {
            return Err(DomainError::bad_input("selector needs at least one choice"));
        }
        Ok(SelectorResult::new(
            (0..choices.len())
                .map(|i| SingleSelection::new(i, "all choices"))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<ToolMetadata> {
        vec![ToolMetadata::new("a", "A"), ToolMetadata::new("b", "B")]
    }

    #[tokio::test]
    async fn test_first_and_all() {
        let ctx = QueryContext::background();
        let query = QueryBundle::new("q");

        let first = FirstChoiceSelector.select(&ctx, &choices(), &query).await.unwrap();
        assert_eq!(first.indices(), vec![0]);

        let all = AllChoicesSelector.select(&ctx, &choices(), &query).await.unwrap();
        assert_eq!(all.indices(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let err = AllChoicesSelector
            .select(&QueryContext::background(), &[], &QueryBundle::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BadInput { .. }));
    }
}
