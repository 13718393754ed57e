//! Question generator implementations

mod llm;

pub use llm::{parse_sub_questions, LlmQuestionGenerator, SUB_QUESTION_PROMPT_KEY};
