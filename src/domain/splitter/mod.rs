//! Text splitting contracts

mod config;
mod splitter;
mod tokenizer;

pub use config::ChunkingConfig;
pub use splitter::{MetadataAwareTextSplitter, SentenceWindowItem, TextSplitter};
pub use tokenizer::Tokenizer;
