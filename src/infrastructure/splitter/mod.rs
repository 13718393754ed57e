//! Text splitter implementations

mod markdown;
mod sentence;
mod sentence_window;
mod split_utils;
mod token;
mod tokenizer;

pub use markdown::MarkdownSplitter;
pub use sentence::{SentenceSplitter, DEFAULT_PARAGRAPH_SEPARATOR, DEFAULT_SECONDARY_REGEX};
pub use sentence_window::{
    SentenceWindowSplitter, ORIGINAL_TEXT_METADATA_KEY, WINDOW_METADATA_KEY,
};
pub use split_utils::SplitRule;
pub use token::TokenTextSplitter;
pub use tokenizer::{default_tokenizer, ByteLengthTokenizer, UnicodeWordTokenizer, WhitespaceTokenizer};
