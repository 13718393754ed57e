//! Selector implementations

mod fallback;
mod llm;

pub use fallback::{AllChoicesSelector, FirstChoiceSelector};
pub use llm::{parse_selection, LlmSelector, DEFAULT_MAX_OUTPUTS, SELECT_PROMPT_KEY};
