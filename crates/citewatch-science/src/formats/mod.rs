pub mod markdown;

pub use markdown::{format_authors, format_citation};
