//! Retriever abstraction

mod retriever;

pub use retriever::Retriever;

#[cfg(test)]
pub use retriever::mock::MockRetriever;
