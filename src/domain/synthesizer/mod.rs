//! Response synthesis contracts and response types

mod mode;
mod response;
mod synthesizer;

pub use mode::ResponseMode;
pub use response::{Response, StreamingResponse, EMPTY_RESPONSE};
pub use synthesizer::ResponseSynthesizer;
