//! Document ingestion

mod pipeline;

pub use pipeline::{
    IngestionPipeline, CHUNK_INDEX_METADATA_KEY, DOCUMENT_ID_METADATA_KEY, SOURCE_METADATA_KEY,
};
