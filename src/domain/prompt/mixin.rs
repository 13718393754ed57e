use std::collections::HashMap;

use super::PromptTemplate;
use crate::domain::DomainError;

/// Prompts of a component, keyed by name (e.g. `text_qa_template`)
pub type PromptDictionary = HashMap<String, PromptTemplate>;

/// Exposes a component's prompts for inspection and replacement
pub trait PromptMixin {
    fn get_prompts(&self) -> PromptDictionary;

    /// Replaces prompts by key. Unknown keys are ignored; a template using a
    /// variable the component never supplies is rejected with `InvalidConfig`.
    fn update_prompts(&mut self, prompts: PromptDictionary) -> Result<(), DomainError>;
}

/// Helper for `update_prompts` implementations
pub fn take_prompt(
    prompts: &mut PromptDictionary,
    key: &str,
    supported: &[&str],
) -> Result<Option<PromptTemplate>, DomainError> {
    match prompts.remove(key) {
        Some(template) => {
            template.check_variables(supported)?;
            Ok(Some(template))
        }
        None => Ok(None),
    }
}
