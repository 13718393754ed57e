use std::fmt::Debug;

/// Measures text size for chunk budgets. Only the token count matters.
pub trait Tokenizer: Send + Sync + Debug {
    fn encode(&self, text: &str) -> Vec<String>;

    fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}
