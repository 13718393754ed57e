//! Agent implementations

mod output_parser;
mod react;

pub use output_parser::parse_reasoning_step;
pub use react::ReActAgent;
