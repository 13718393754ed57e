//! Tool abstractions shared by agents, routers and sub-question engines

mod call;
mod metadata;
mod tool;

pub use call::{ToolCall, ToolOutput};
pub use metadata::ToolMetadata;
pub use tool::Tool;

#[cfg(test)]
pub use tool::MockTool;
