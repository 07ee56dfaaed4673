pub mod arxiv;
pub mod doi;
pub mod extract;

pub use arxiv::{ArxivId, extract_arxiv_id};
pub use doi::{Doi, extract_doi};
pub use extract::{PaperLink, find_unique_urls, find_urls};
