//! Query engine implementations

mod retriever_engine;
mod retry;
mod router;
mod sub_question;
mod transform;

pub use retriever_engine::RetrieverQueryEngine;
pub use retry::{RetryQueryEngine, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use router::{RouterQueryEngine, SELECTED_ENGINES_METADATA_KEY};
pub use sub_question::{
    SubQuestionAnswer, SubQuestionQueryEngine, FAILED_SUB_QUESTIONS_METADATA_KEY,
    SUB_QA_METADATA_KEY,
};
pub use transform::TransformQueryEngine;
