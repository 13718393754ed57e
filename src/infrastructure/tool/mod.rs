//! Tool implementations for agents

mod function;
mod query_engine;

pub use function::FunctionTool;
pub use query_engine::{QueryEngineTool, RetrieverTool};
