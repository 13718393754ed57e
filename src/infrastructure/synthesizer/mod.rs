//! Response synthesizer implementations

mod accumulate;
mod compact;
mod degenerate;
mod factory;
mod prompts;
mod refine;
mod simple;
mod structured;
mod tree;

pub use accumulate::{Accumulate, DEFAULT_ACCUMULATE_SEPARATOR};
pub use compact::{merge_pairs, Compactor, DEFAULT_COMPACT_SIZE};
pub use degenerate::{ContextOnly, Generation, NoText};
pub use factory::{get_response_synthesizer, SynthesizerBuilder};
pub use prompts::{REFINE_PROMPT_KEY, SIMPLE_PROMPT_KEY, SUMMARY_PROMPT_KEY, TEXT_QA_PROMPT_KEY};
pub use refine::Refine;
pub use simple::SimpleSummarize;
pub use structured::{
    extract_json, parse_structured, StructuredSynthesizer, PARSE_FAILED_METADATA_KEY,
    STRUCTURED_METADATA_KEY,
};
pub use tree::TreeSummarize;
