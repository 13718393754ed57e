//! Source documents fed into the ingestion pipeline

mod document;

pub use document::Document;
