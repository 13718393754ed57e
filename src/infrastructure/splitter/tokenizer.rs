//! Built-in tokenizers used to measure chunk budgets

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::splitter::Tokenizer;

/// Whitespace-delimited words
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Unicode word boundaries (UAX #29), punctuation excluded
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordTokenizer;

impl Tokenizer for UnicodeWordTokenizer {
    fn encode(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(str::to_string).collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.unicode_words().count()
    }
}

/// One token per byte; the size proxy used for prompt compaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteLengthTokenizer;

impl Tokenizer for ByteLengthTokenizer {
    fn encode(&self, text: &str) -> Vec<String> {
        text.bytes().map(|b| b.to_string()).collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.len()
    }
}

pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    Arc::new(WhitespaceTokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer;
        assert_eq!(tokenizer.encode("  A B\n C "), vec!["A", "B", "C"]);
        assert_eq!(tokenizer.count_tokens(""), 0);
    }

    #[test]
    fn test_unicode_word_tokenizer_skips_punctuation() {
        let tokenizer = UnicodeWordTokenizer;
        assert_eq!(tokenizer.encode("Hello, world!"), vec!["Hello", "world"]);
    }

    #[test]
    fn test_byte_length_tokenizer() {
        let tokenizer = ByteLengthTokenizer;
        assert_eq!(tokenizer.count_tokens("héllo"), 6);
        assert_eq!(tokenizer.encode("ab").len(), 2);
    }
}
