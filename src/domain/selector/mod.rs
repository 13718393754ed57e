//! Choosing among candidate tools for a query

mod selector;

pub use selector::{Selector, SelectorResult, SingleSelection};

#[cfg(test)]
pub use selector::mock::FixedSelector;
