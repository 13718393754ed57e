//! Decomposing a query into tool-targeted sub-questions

mod generator;

pub use generator::{QuestionGenerator, SubQuestion};

#[cfg(test)]
pub use generator::mock::StaticQuestionGenerator;
