//! Citewatch Science: link extraction, paper metadata, PDFs and citations.

pub mod arxiv;
pub mod download;
pub mod error;
pub mod formats;
pub mod http;
pub mod identifiers;
pub mod notes;
pub mod pipeline;
pub mod resolver;
pub mod sources;
pub mod types;

pub use error::{Result, ScienceError};
pub use pipeline::{NotePipeline, NoteReport};
pub use resolver::MetadataResolver;
pub use types::{PaperRecord, Resolution};
