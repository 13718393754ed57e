//! Query engine abstraction

mod engine;

pub use engine::QueryEngine;

#[cfg(test)]
pub use engine::mock::MockQueryEngine;
