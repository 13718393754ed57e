//! Query transform implementations

mod hyde;
mod identity;

pub use hyde::{HydeTransform, HYDE_PROMPT_KEY};
pub use identity::IdentityTransform;
