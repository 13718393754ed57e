//! Prompt templates, defaults and the prompt-override mixin

pub mod defaults;
mod mixin;
mod template;

pub use mixin::{take_prompt, PromptDictionary, PromptMixin};
pub use template::{PromptTemplate, TemplateError};
