use async_trait::async_trait;

use crate::identifiers::arxiv::ArxivId;
use crate::types::Resolution;

/// A metadata source the resolver can fall back through.
#[async_trait]
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, id: &ArxivId) -> Resolution;
}

pub mod semantic_scholar;

pub use semantic_scholar::{S2PaperId, SemanticScholarSource};
